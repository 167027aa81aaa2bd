//! CLI tests for `resolver resolve`, `resolver plan`, and `resolver features`.
//!
//! Spawns the resolver binary against a policy file and an offer sheet and
//! verifies exit codes for acquired, not-found, and failing resolutions.

use std::collections::BTreeMap;
use std::path::Path;
use std::process::{Command, Output};

use resolver::exit_codes;
use resolver::io::offers::{ExpectedCredentials, Offer, OfferSheet, SourceSettings};
use resolver::test_support::TestWorkspace;

fn offer(source: &str, short_name: &str, workers: Option<u32>, can_choose: bool) -> Offer {
    Offer {
        source: source.to_string(),
        short_name: short_name.to_string(),
        workers,
        can_choose_workers: can_choose,
        ..Offer::default()
    }
}

fn sheet(offers: Vec<Offer>) -> OfferSheet {
    OfferSheet {
        sources: BTreeMap::new(),
        offers,
    }
}

fn resolve(policy: &Path, offers: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_resolver"));
    cmd.arg("resolve")
        .arg("--policy")
        .arg(policy)
        .arg("--offers")
        .arg(offers)
        .env_remove("RUST_LOG");
    cmd
}

fn run(mut cmd: Command) -> Output {
    cmd.output().expect("spawn resolver")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn resolve_acquires_matching_offer() {
    let ws = TestWorkspace::new().expect("workspace");
    let policy = ws
        .write_policy("[source]\nkind = \"dongle\"\n\n[filters]\nmin_workers = 4\n")
        .expect("policy");
    let offers = ws
        .write_offers(&sheet(vec![
            offer("dongle", "Server", Some(64), false),
            offer("dongle", "small", Some(2), false),
            offer("dongle", "enterprise-workstation", Some(8), false),
        ]))
        .expect("offers");

    let output = run(resolve(&policy, &offers));

    assert_eq!(output.status.code(), Some(exit_codes::OK), "{}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("acquired enterprise-workstation (whole allotment)"));
    assert!(out.contains("ShortName=enterprise-workstation"));
    assert!(out.contains("Location=local"));
    assert!(stderr(&output).contains("skipped small"));
}

#[test]
fn resolve_requests_workers_from_shared_pool() {
    let ws = TestWorkspace::new().expect("workspace");
    let policy = ws
        .write_policy("[source]\nkind = \"dongle\"\n\n[filters]\nmin_workers = 6\n")
        .expect("policy");
    let offers = ws
        .write_offers(&sheet(vec![offer("dongle", "pool", Some(32), true)]))
        .expect("offers");

    let output = run(resolve(&policy, &offers));

    assert_eq!(output.status.code(), Some(exit_codes::OK), "{}", stderr(&output));
    assert!(stdout(&output).contains("acquired pool (6 workers)"));
}

#[test]
fn resolve_without_match_exits_not_found() {
    let ws = TestWorkspace::new().expect("workspace");
    let policy = ws
        .write_policy("[filters]\nmin_workers = 64\n")
        .expect("policy");
    let offers = ws
        .write_offers(&sheet(vec![offer("dongle", "small", Some(2), false)]))
        .expect("offers");

    let output = run(resolve(&policy, &offers));

    assert_eq!(output.status.code(), Some(exit_codes::NOT_FOUND));
    assert!(stderr(&output).contains("no license matched"));
}

#[test]
fn resolve_with_invalid_policy_exits_invalid() {
    let ws = TestWorkspace::new().expect("workspace");
    let policy = ws
        .write_policy("[source]\nkind = \"floppy\"\n")
        .expect("policy");
    let offers = ws.write_offers(&sheet(Vec::new())).expect("offers");

    let output = run(resolve(&policy, &offers));

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
}

#[test]
fn resolve_propagates_offline_source() {
    let ws = TestWorkspace::new().expect("workspace");
    let policy = ws.write_policy("[source]\nkind = \"dongle\"\n").expect("policy");
    let mut offline = sheet(vec![offer("dongle", "a", Some(2), false)]);
    offline.sources.insert(
        "dongle".to_string(),
        SourceSettings {
            online: false,
            ..SourceSettings::default()
        },
    );
    let offers = ws.write_offers(&offline).expect("offers");

    let output = run(resolve(&policy, &offers));

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(stderr(&output).contains("unreachable"));
}

#[test]
fn resolve_reports_exhausted_seats() {
    let ws = TestWorkspace::new().expect("workspace");
    let policy = ws.write_policy("").expect("policy");
    let mut taken = offer("dongle", "single-seat", Some(2), false);
    taken.seats = Some(0);
    let offers = ws.write_offers(&sheet(vec![taken])).expect("offers");

    let output = run(resolve(&policy, &offers));

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(stderr(&output).contains("no seats left"));
}

fn cloud_with_credentials() -> OfferSheet {
    let mut cloud = sheet(vec![offer("cloud-server", "cloud-workstation", Some(4), false)]);
    cloud.sources.insert(
        "cloud-server".to_string(),
        SourceSettings {
            credentials: Some(ExpectedCredentials {
                username: "alice".to_string(),
                password: "s3cret".to_string(),
            }),
            ..SourceSettings::default()
        },
    );
    cloud
}

const CLOUD_ENV_POLICY: &str = "[source]\nkind = \"cloud\"\n\n[credentials]\nmode = \"env\"\nusername_var = \"RESOLVER_TEST_USER\"\npassword_var = \"RESOLVER_TEST_PASS\"\n";

#[test]
fn resolve_reads_credentials_from_environment() {
    let ws = TestWorkspace::new().expect("workspace");
    let policy = ws.write_policy(CLOUD_ENV_POLICY).expect("policy");
    let offers = ws.write_offers(&cloud_with_credentials()).expect("offers");

    let mut cmd = resolve(&policy, &offers);
    cmd.env("RESOLVER_TEST_USER", "alice")
        .env("RESOLVER_TEST_PASS", "s3cret");
    let output = run(cmd);

    assert_eq!(output.status.code(), Some(exit_codes::OK), "{}", stderr(&output));
    assert!(stdout(&output).contains("Location=https://licence-api.nuix.com"));
}

#[test]
fn resolve_rejects_wrong_credentials() {
    let ws = TestWorkspace::new().expect("workspace");
    let policy = ws.write_policy(CLOUD_ENV_POLICY).expect("policy");
    let offers = ws.write_offers(&cloud_with_credentials()).expect("offers");

    let mut cmd = resolve(&policy, &offers);
    cmd.env("RESOLVER_TEST_USER", "alice")
        .env("RESOLVER_TEST_PASS", "guess");
    let output = run(cmd);

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(stderr(&output).contains("authentication failed"));
}

#[test]
fn plan_prints_options_and_endpoint() {
    let ws = TestWorkspace::new().expect("workspace");
    let policy = ws
        .write_policy("[source]\nkind = \"server\"\nhost = \"nms.internal\"\n")
        .expect("policy");

    let output = Command::new(env!("CARGO_BIN_EXE_resolver"))
        .arg("plan")
        .arg("--policy")
        .arg(&policy)
        .output()
        .expect("resolver plan");

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let out = stdout(&output);
    assert!(out.contains(r#"options: {"sources":"server"}"#));
    assert!(out.contains("endpoint: nms.internal:27443"));
}

#[test]
fn features_lists_known_features() {
    let output = Command::new(env!("CARGO_BIN_EXE_resolver"))
        .arg("features")
        .output()
        .expect("resolver features");

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let out = stdout(&output);
    assert_eq!(out.lines().count(), 42);
    assert!(out.lines().any(|line| line == "CASE_CREATION"));
}

#[test]
fn resolve_can_print_feature_matrix() {
    let ws = TestWorkspace::new().expect("workspace");
    let policy = ws.write_policy("").expect("policy");
    let mut ocr = offer("dongle", "ocr-workstation", Some(2), false);
    ocr.features = vec!["OCR_PROCESSING".to_string()];
    let offers = ws.write_offers(&sheet(vec![ocr])).expect("offers");

    let mut cmd = resolve(&policy, &offers);
    cmd.arg("--show-features");
    let output = run(cmd);

    assert_eq!(output.status.code(), Some(exit_codes::OK), "{}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("License Features:"));
    assert!(out.contains("[X] OCR_PROCESSING"));
    assert!(out.contains("[ ] CASE_CREATION"));
}
