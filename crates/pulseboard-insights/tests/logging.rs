use pulseboard_insights::logging;

#[test]
fn init_installs_once() {
    assert!(logging::init("pulseboard_insights=debug").is_ok());
    assert!(logging::init("pulseboard_insights=debug").is_err());
}

#[test]
fn init_rejects_bad_directive() {
    assert!(logging::init("pulseboard_insights=loud").is_err());
}
