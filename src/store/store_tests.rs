use super::*;
use crate::config::Config;
use crate::context::Verbosity;
use std::fs;

fn store_with_scripts(dir: &std::path::Path, limit: usize) -> Store {
    let cfg = Config { scripts_dir: dir.to_path_buf(), console_row_limit: limit, ..Config::default() };
    Store::open_in_memory(&SessionContext::new(cfg, Verbosity::Quiet)).unwrap()
}

fn seed(store: &Store) {
    store
        .connection()
        .execute_batch(
            "CREATE TABLE laps (driver TEXT, lap INTEGER, ms REAL);
             INSERT INTO laps VALUES ('ham', 1, 90000.5), ('ver', 1, 89000), ('ham', 2, NULL), ('say \"hi\"', 3, 1);",
        )
        .unwrap();
}

#[test]
fn identifiers_are_checked_before_splicing() {
    assert_eq!(quote_identifier("lap_times").unwrap(), "\"lap_times\"");
    assert!(matches!(quote_identifier("x; DROP TABLE y"), Err(F1dbError::InvalidIdentifier(_))));
    assert!(quote_identifier("").is_err());
}

#[test]
fn extensions_are_installed_on_open() {
    let tmp = tempfile::tempdir().unwrap();
    let store = store_with_scripts(tmp.path(), 20);
    let v: i64 = store.connection().query_row("SELECT POWER(3, 4)", [], |r| r.get(0)).unwrap();
    assert_eq!(v, 81);
}

#[test]
fn query_caps_rows_and_flags_truncation() {
    let tmp = tempfile::tempdir().unwrap();
    let store = store_with_scripts(tmp.path(), 2);
    seed(&store);
    let res = store.query("SELECT driver, lap FROM laps ORDER BY lap, driver").unwrap();
    assert_eq!(res.columns, vec!["driver", "lap"]);
    assert_eq!(res.rows.len(), 2);
    assert!(res.truncated);

    let exact = store.query("SELECT driver FROM laps WHERE lap = 1").unwrap();
    assert_eq!(exact.rows.len(), 2);
    assert!(!exact.truncated);
}

#[test]
fn query_rejects_writes() {
    let tmp = tempfile::tempdir().unwrap();
    let store = store_with_scripts(tmp.path(), 20);
    seed(&store);
    let err = store.query("DELETE FROM laps").unwrap_err();
    assert_eq!(err.code_str(), "not_read_only");
    assert_eq!(store.row_count("laps").unwrap(), 4);
}

#[test]
fn query_rejects_blank_statements() {
    let tmp = tempfile::tempdir().unwrap();
    let store = store_with_scripts(tmp.path(), 20);
    for sql in ["", "   \n", "-- just a comment", "/* nothing */;"] {
        let err = store.query(sql).unwrap_err();
        assert!(matches!(err, F1dbError::EmptyStatement), "{sql:?}: {err:?}");
        assert!(err.is_recoverable());
    }
    assert_eq!(store.query("-- leading comment\nSELECT 1").unwrap().rows.len(), 1);
}

#[test]
fn query_result_json_keeps_nulls() {
    let tmp = tempfile::tempdir().unwrap();
    let store = store_with_scripts(tmp.path(), 20);
    seed(&store);
    let res = store.query("SELECT lap, ms FROM laps WHERE driver = 'ham' ORDER BY lap").unwrap();
    let v = res.to_json();
    assert_eq!(v["rows"][0][0], 1);
    assert!(v["rows"][1][1].is_null());
    assert_eq!(v["truncated"], false);
}

#[test]
fn run_script_is_all_or_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("good.sql"), "CREATE TABLE t AS SELECT $n AS n;").unwrap();
    fs::write(tmp.path().join("bad.sql"), "CREATE TABLE u (a INTEGER); INSERT INTO missing_table VALUES (1);").unwrap();
    let store = store_with_scripts(tmp.path(), 20);

    let mut params = ScriptParams::new();
    params.insert("n".into(), "7".into());
    store.run_script("good", &params).unwrap();
    assert_eq!(store.row_count("t").unwrap(), 1);

    let err = store.run_script("bad.sql", &ScriptParams::new()).unwrap_err();
    match err {
        F1dbError::Script { script, source } => {
            assert_eq!(script, "bad.sql");
            assert!(source.to_string().contains("missing_table"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!store.has_table("u").unwrap());
}

#[test]
fn scalar_failure_in_script_names_the_script() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("bad.sql"), "CREATE TABLE t AS SELECT SQRT(-1) AS x;").unwrap();
    fs::write(tmp.path().join("thin.sql"), "CREATE TABLE s AS SELECT STDEV(x) AS sd FROM (SELECT 1 AS x);").unwrap();
    let store = store_with_scripts(tmp.path(), 20);

    let err = store.run_script("bad.sql", &ScriptParams::new()).unwrap_err();
    assert_eq!(err.code_str(), "script_error");
    match err {
        F1dbError::Script { script, source } => {
            assert_eq!(script, "bad.sql");
            assert!(source.to_string().contains("SQRT"));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let err = store.run_script("thin", &ScriptParams::new()).unwrap_err();
    assert_eq!(err.code_str(), "aggregate_domain");
    assert!(matches!(err, F1dbError::AggregateDomain { script: Some(ref s), .. } if s == "thin.sql"));
    assert!(!store.has_table("t").unwrap());
    assert!(!store.has_table("s").unwrap());
}

#[test]
fn scripts_with_their_own_transactions_run_as_written() {
    let tmp = tempfile::tempdir().unwrap();
    let db = tmp.path().join("f1.db");
    fs::write(tmp.path().join("explicit.sql"), "BEGIN;\nCREATE TABLE t (x INTEGER);\nINSERT INTO t VALUES (1), (2);\nCOMMIT;").unwrap();
    fs::write(tmp.path().join("compact.sql"), "DROP TABLE IF EXISTS scratch;\nVACUUM;").unwrap();
    let cfg = Config { database_file: db, scripts_dir: tmp.path().to_path_buf(), ..Config::default() };
    let store = Store::open(&SessionContext::new(cfg, Verbosity::Quiet)).unwrap();

    store.run_script("explicit", &ScriptParams::new()).unwrap();
    assert_eq!(store.row_count("t").unwrap(), 2);
    store.run_script("compact", &ScriptParams::new()).unwrap();
    assert_eq!(store.row_count("t").unwrap(), 2);
    // the connection is back in autocommit afterwards
    assert!(store.connection().is_autocommit());
}

#[test]
fn run_script_requires_every_placeholder() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("p.sql"), "SELECT $race_id;").unwrap();
    let store = store_with_scripts(tmp.path(), 20);
    let err = store.run_script("p", &ScriptParams::new()).unwrap_err();
    assert!(matches!(err, F1dbError::MissingParameters { .. }));
}

#[test]
fn cursor_streams_every_row() {
    let tmp = tempfile::tempdir().unwrap();
    let store = store_with_scripts(tmp.path(), 1);
    seed(&store);
    let mut cur = store.cursor("laps").unwrap();
    assert_eq!(cur.columns(), &["driver", "lap", "ms"]);
    let rows: Vec<Vec<Value>> = cur.rows().unwrap().collect::<F1dbResult<_>>().unwrap();
    // the display cap does not apply to cursors
    assert_eq!(rows.len(), 4);
}

#[test]
fn export_writes_quoted_text_and_null_token() {
    let tmp = tempfile::tempdir().unwrap();
    let store = store_with_scripts(tmp.path(), 20);
    seed(&store);
    let out = tmp.path().join("laps.csv");
    let summary = store.export_table("laps", Some(&out)).unwrap();
    assert_eq!(summary.rows, 4);
    let text = fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "\"driver\",\"lap\",\"ms\"");
    assert!(lines.contains(&"\"ham\",1,90000.5"));
    assert!(lines.contains(&"\"ham\",2,\\N"));
    assert!(lines.contains(&"\"say \"\"hi\"\"\",3,1"));
}

#[test]
fn export_unknown_table_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let store = store_with_scripts(tmp.path(), 20);
    let err = store.export_table("nope", Some(&tmp.path().join("nope.csv"))).unwrap_err();
    assert_eq!(err.code_str(), "sql_error");
}

#[test]
fn frame_types_follow_values() {
    let tmp = tempfile::tempdir().unwrap();
    let store = store_with_scripts(tmp.path(), 20);
    seed(&store);
    let df = store.table_frame("laps").unwrap();
    assert_eq!(df.height(), 4);
    assert_eq!(df.column("driver").unwrap().dtype(), &polars::prelude::DataType::String);
    assert_eq!(df.column("lap").unwrap().dtype(), &polars::prelude::DataType::Int64);
    assert_eq!(df.column("ms").unwrap().dtype(), &polars::prelude::DataType::Float64);
}

#[test]
fn close_is_explicit() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("nested").join("f1.db");
    let cfg = Config { database_file: path.clone(), scripts_dir: tmp.path().to_path_buf(), ..Config::default() };
    let store = Store::open(&SessionContext::new(cfg, Verbosity::Quiet)).unwrap();
    store.connection().execute_batch("CREATE TABLE k (x INTEGER)").unwrap();
    store.close().unwrap();
    assert!(path.exists());
}
