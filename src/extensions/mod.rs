//! Extension registry: the custom scalar and aggregate SQL functions the
//! transformation scripts rely on.
//!
//! Every function is a tagged [`Extension`] value held under its SQL name. A
//! [`Store`](crate::store::Store) installs the whole registry into its
//! connection once, before any statement runs; dispatch at install time is a
//! plain match on the variant.

use std::collections::BTreeMap;
use std::fmt;

use rusqlite::functions::{Aggregate, Context, FunctionFlags};
use rusqlite::types::{Value, ValueRef};
use rusqlite::Connection;
use thiserror::Error;
use tracing::debug;

mod aggregates;
mod scalars;

pub use aggregates::{collect_numeric, population_stdev, sample_stdev};
pub use scalars::{ms_to_hhmmss, power, sqrt};

/// Marker carried by an aggregate's "not enough values" failure. SQLite
/// flattens user function errors into text, so this is what lets callers
/// recognise them. Scalar failures do not carry it.
pub const DOMAIN_ERROR_TAG: &str = "extension domain error";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExtensionError {
    #[error("extension domain error in {function}: needs at least {required} numeric value(s), got {actual}")]
    InsufficientData { function: &'static str, required: usize, actual: usize },
    #[error("{function}: {message}")]
    Domain { function: &'static str, message: String },
    #[error("{function} expects a numeric argument at position {index}")]
    NotNumeric { function: &'static str, index: usize },
}

/// Accumulated numeric inputs of one aggregate group.
pub type Samples = Vec<f64>;

pub type ScalarFn = fn(&[ValueRef<'_>]) -> Result<Value, ExtensionError>;
pub type StepFn = fn(&mut Samples, ValueRef<'_>);
pub type FinalizeFn = fn(&[f64]) -> Result<f64, ExtensionError>;

/// A custom SQL function: either pure and stateless, or a streaming aggregate
/// that folds one value per row and reduces once per group.
#[derive(Clone, Copy)]
pub enum Extension {
    Scalar { arity: u8, func: ScalarFn },
    Aggregate { init: fn() -> Samples, step: StepFn, finalize: FinalizeFn },
}

impl Extension {
    pub fn is_aggregate(&self) -> bool { matches!(self, Extension::Aggregate { .. }) }

    pub fn arity(&self) -> u8 {
        match self {
            Extension::Scalar { arity, .. } => *arity,
            Extension::Aggregate { .. } => 1,
        }
    }
}

impl fmt::Debug for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Extension::Scalar { arity, .. } => f.debug_struct("Scalar").field("arity", arity).finish_non_exhaustive(),
            Extension::Aggregate { .. } => f.debug_struct("Aggregate").finish_non_exhaustive(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ExtensionRegistry {
    functions: BTreeMap<String, Extension>, // SQL name (upper case) -> function
}

impl ExtensionRegistry {
    pub fn new() -> Self { Self::default() }

    /// The functions every store handle carries.
    pub fn builtin() -> Self {
        let mut reg = Self::new();
        reg.register("POWER", Extension::Scalar { arity: 2, func: power });
        reg.register("SQRT", Extension::Scalar { arity: 1, func: sqrt });
        reg.register("MS_TO_HHMMSS", Extension::Scalar { arity: 1, func: ms_to_hhmmss });
        reg.register("STDEV", Extension::Aggregate { init: Samples::new, step: collect_numeric, finalize: sample_stdev });
        reg.register("STDEV_POP", Extension::Aggregate { init: Samples::new, step: collect_numeric, finalize: population_stdev });
        reg
    }

    #[inline]
    fn norm(name: &str) -> String { name.to_ascii_uppercase() }

    /// Add or replace a function; returns the one it replaced.
    pub fn register(&mut self, name: &str, extension: Extension) -> Option<Extension> {
        self.functions.insert(Self::norm(name), extension)
    }

    pub fn get(&self, name: &str) -> Option<&Extension> { self.functions.get(&Self::norm(name)) }

    pub fn names(&self) -> impl Iterator<Item = &str> { self.functions.keys().map(String::as_str) }

    pub fn len(&self) -> usize { self.functions.len() }

    pub fn is_empty(&self) -> bool { self.functions.is_empty() }

    /// Register every function with the engine behind `conn`.
    pub fn install(&self, conn: &Connection) -> rusqlite::Result<()> {
        let flags = FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC;
        for (name, extension) in &self.functions {
            match *extension {
                Extension::Scalar { arity, func } => {
                    conn.create_scalar_function(name.as_str(), i32::from(arity), flags, move |ctx| {
                        let args: Vec<ValueRef<'_>> = (0..ctx.len()).map(|i| ctx.get_raw(i)).collect();
                        func(&args).map_err(|err| rusqlite::Error::UserFunctionError(Box::new(err)))
                    })?;
                }
                Extension::Aggregate { init, step, finalize } => {
                    conn.create_aggregate_function(name.as_str(), 1, flags, SqlAggregate { init, step, finalize })?;
                }
            }
            debug!(function = %name, aggregate = extension.is_aggregate(), "installed extension function");
        }
        Ok(())
    }
}

// Adapter between the tagged aggregate and the engine's step/finalize protocol.
struct SqlAggregate {
    init: fn() -> Samples,
    step: StepFn,
    finalize: FinalizeFn,
}

impl Aggregate<Samples, f64> for SqlAggregate {
    fn init(&self, _ctx: &mut Context<'_>) -> rusqlite::Result<Samples> { Ok((self.init)()) }

    fn step(&self, ctx: &mut Context<'_>, acc: &mut Samples) -> rusqlite::Result<()> {
        (self.step)(acc, ctx.get_raw(0));
        Ok(())
    }

    // `acc` is None when the group never saw a row.
    fn finalize(&self, _ctx: &mut Context<'_>, acc: Option<Samples>) -> rusqlite::Result<f64> {
        let samples = acc.unwrap_or_default();
        (self.finalize)(&samples).map_err(|err| rusqlite::Error::UserFunctionError(Box::new(err)))
    }
}
