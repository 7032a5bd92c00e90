#![allow(dead_code)]

use std::path::{Path, PathBuf};

use f1db::config::Config;
use f1db::context::{SessionContext, Verbosity};
use f1db::rebuild::rebuild_database;
use f1db::store::{display_value, Store};
use f1db::system_paths::{repo_queries_file, repo_sql_dir};

pub fn fixture_csv_dir() -> PathBuf { PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures").join("csv") }

/// Fixture data, bundled scripts, and a database file inside `dir`.
pub fn fixture_config(dir: &Path) -> Config {
    Config {
        database_file: dir.join("f1.db"),
        csv_dir: fixture_csv_dir(),
        custom_csv_dir: dir.join("no_custom_data"),
        scripts_dir: repo_sql_dir(),
        queries_file: repo_queries_file(),
        ..Config::default()
    }
}

pub fn fixture_ctx(dir: &Path) -> SessionContext { SessionContext::new(fixture_config(dir), Verbosity::Quiet) }

/// Rebuild the fixture database in `dir` and open a handle on it.
pub fn rebuilt_store(dir: &Path) -> Store {
    let ctx = fixture_ctx(dir);
    rebuild_database(&ctx).expect("rebuild");
    Store::open(&ctx).expect("open")
}

/// Every row of `table` rendered to text and sorted, for order-free comparison.
pub fn sorted_rows(store: &Store, table: &str) -> Vec<String> {
    let mut cursor = store.cursor(table).expect("cursor");
    let mut rows: Vec<String> = cursor
        .rows()
        .expect("rows")
        .map(|r| {
            let r = r.expect("row");
            r.iter().map(|v| format!("{v:?}")).collect::<Vec<_>>().join("|")
        })
        .collect();
    rows.sort();
    rows
}

pub fn scalar_i64(store: &Store, sql: &str) -> i64 {
    let res = store.query(sql).expect("query");
    match &res.rows[0][0] {
        rusqlite::types::Value::Integer(i) => *i,
        other => panic!("expected integer from {sql}, got {}", display_value(other)),
    }
}

/// Write a synthetic season as CSV files under `dir` and return the directory.
/// Every race starts `drivers` cars over `laps` laps with random adjacent
/// swaps each lap; two cars per race retire and the leader pits every 20 laps.
pub fn write_generated_season(dir: &Path, races: usize, drivers: usize, laps: usize) -> PathBuf {
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};

    let out = dir.join("generated_csv");
    std::fs::create_dir_all(&out).expect("csv dir");
    let mut rng = StdRng::seed_from_u64(0x00F1_2024);

    let mut races_csv = String::from("race_id,year,round,circuit_id,name\n");
    let mut results = String::from(
        "result_id,race_id,driver_id,constructor_id,grid,position,position_text,position_order,points,laps,status_id\n",
    );
    let mut lap_times = String::from("race_id,driver_id,lap,position,time,milliseconds\n");
    let mut pit_stops = String::from("race_id,driver_id,stop,lap\n");
    let mut drivers_csv = String::from("driver_id,driver_ref,forename,surname\n");
    for d in 1..=drivers {
        drivers_csv.push_str(&format!("{d},driver_{d},Driver,Number {d}\n"));
    }

    let mut result_id = 0;
    for race in 1..=races {
        races_csv.push_str(&format!("{race},2000,{race},1,Race {race}\n"));
        let mut order: Vec<usize> = (1..=drivers).collect();
        order.shuffle(&mut rng);
        let grid: Vec<(usize, usize)> = order.iter().enumerate().map(|(i, d)| (*d, i + 1)).collect();
        let retired = [(order[drivers - 1], laps / 2), (order[drivers / 2], laps / 3)];
        let mut completed = vec![0usize; drivers + 1];

        for lap in 1..=laps {
            order.retain(|d| !retired.iter().any(|(r, at)| r == d && lap > *at));
            for i in 0..order.len().saturating_sub(1) {
                if rng.gen::<f64>() < 0.15 {
                    order.swap(i, i + 1);
                }
            }
            for (i, d) in order.iter().enumerate() {
                let ms = 90_000 + rng.gen_range(0..5_000);
                lap_times.push_str(&format!("{race},{d},{lap},{},1:30.000,{ms}\n", i + 1));
                completed[*d] = lap;
            }
            if lap % 20 == 0 {
                pit_stops.push_str(&format!("{race},{},{},{lap}\n", order[0], lap / 20));
            }
        }

        for (d, start) in grid {
            result_id += 1;
            let (position, position_text, position_order, status) = match order.iter().position(|x| *x == d) {
                Some(i) => ((i + 1).to_string(), (i + 1).to_string(), i + 1, 1),
                None => {
                    let k = retired.iter().position(|(r, _)| *r == d).unwrap_or(0);
                    ("\\N".to_string(), "R".to_string(), order.len() + 1 + k, 5)
                }
            };
            results.push_str(&format!(
                "{result_id},{race},{d},1,{start},{position},{position_text},{position_order},0,{},{status}\n",
                completed[d]
            ));
        }
    }

    let files = [
        ("circuits.csv", "circuit_id,circuit_ref,name\n1,generated,Generated Circuit\n".to_string()),
        ("constructors.csv", "constructor_id,constructor_ref,name\n1,generated,Generated Racing\n".to_string()),
        ("status.csv", "status_id,status\n1,Finished\n5,Engine\n".to_string()),
        ("drivers.csv", drivers_csv),
        ("races.csv", races_csv),
        ("results.csv", results),
        ("lap_times.csv", lap_times),
        ("pit_stops.csv", pit_stops),
    ];
    for (name, body) in files {
        std::fs::write(out.join(name), body).expect("write csv");
    }
    out
}
