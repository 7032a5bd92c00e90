use super::*;

fn params(pairs: &[(&str, &str)]) -> ScriptParams {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

#[test]
fn placeholders_are_deduplicated() {
    let script = SqlScript::new("lap_chart.sql", "SELECT * FROM laps WHERE race_id = $race_id AND lap <= $max_lap OR race_id = $race_id;");
    let names: Vec<String> = script.placeholders().into_iter().collect();
    assert_eq!(names, vec!["max_lap".to_string(), "race_id".to_string()]);
}

#[test]
fn render_substitutes_whole_tokens() {
    let script = SqlScript::new("q.sql", "SELECT $race, $race_id;");
    let out = script.render(&params(&[("race", "'Monaco'"), ("race_id", "1074")])).unwrap();
    assert_eq!(out, "SELECT 'Monaco', 1074;");
}

#[test]
fn render_fails_fast_on_missing_values() {
    let script = SqlScript::new("q.sql", "SELECT $a, $b, $c;");
    let err = script.render(&params(&[("b", "2")])).unwrap_err();
    match err {
        F1dbError::MissingParameters { script, names } => {
            assert_eq!(script, "q.sql");
            assert_eq!(names, vec!["a".to_string(), "c".to_string()]);
        }
        other => panic!("expected MissingParameters, got {other:?}"),
    }
}

#[test]
fn script_without_placeholders_renders_verbatim() {
    let script = SqlScript::new("plain.sql", "DROP TABLE IF EXISTS t; CREATE TABLE t (x);");
    assert!(script.placeholders().is_empty());
    assert_eq!(script.render(&ScriptParams::new()).unwrap(), script.text());
}

#[test]
fn library_loads_and_lists() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("b.sql"), "SELECT 2;").unwrap();
    std::fs::write(tmp.path().join("a.sql"), "SELECT $x;").unwrap();
    std::fs::write(tmp.path().join("notes.txt"), "ignored").unwrap();
    let lib = ScriptLibrary::new(tmp.path());
    assert_eq!(lib.list().unwrap(), vec!["a.sql".to_string(), "b.sql".to_string()]);

    let a = lib.load("a").unwrap();
    assert_eq!(a.name(), "a.sql");
    assert_eq!(a.placeholders().len(), 1);
    assert_eq!(lib.load("b.sql").unwrap().text(), "SELECT 2;");

    let err = lib.load("missing").unwrap_err();
    assert!(matches!(err, F1dbError::UnknownScript { ref name, .. } if name == "missing.sql"));
}

#[test]
fn blank_means_no_code() {
    assert!(is_blank(""));
    assert!(is_blank("  \n\t"));
    assert!(is_blank("-- just a comment"));
    assert!(is_blank("/* block */ ;\n-- trailing"));
    assert!(!is_blank("SELECT 1 -- with a comment"));
    assert!(!is_blank("''"));
}

#[test]
fn transaction_control_is_found_at_statement_starts() {
    assert!(controls_transactions("BEGIN; CREATE TABLE a (x); COMMIT;"));
    assert!(controls_transactions("CREATE TABLE a (x);\nVACUUM;"));
    assert!(controls_transactions("savepoint s1; RELEASE s1;"));
    assert!(controls_transactions("BEGIN TRANSACTION; DELETE FROM a; END TRANSACTION;"));
    // keywords in comments, literals and CASE expressions do not count
    assert!(!controls_transactions("-- BEGIN\nSELECT 1;"));
    assert!(!controls_transactions("SELECT 'x; COMMIT';"));
    assert!(!controls_transactions("SELECT CASE WHEN lap > 1 THEN 'ok'\nEND AS kind FROM laps;"));
    assert!(!controls_transactions("CREATE TABLE beginnings (x);"));
}
