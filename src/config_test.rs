use super::*;

#[test]
fn env_parse_missing_returns_default() {
    let val: usize = env_parse("__LESSONBOARD_TEST_MISSING__", 42);
    assert_eq!(val, 42);
}

#[test]
fn env_parse_present_valid() {
    unsafe { std::env::set_var("__LESSONBOARD_TEST_VALID__", "99") };
    let val: u64 = env_parse("__LESSONBOARD_TEST_VALID__", 0);
    assert_eq!(val, 99);
    unsafe { std::env::remove_var("__LESSONBOARD_TEST_VALID__") };
}

#[test]
fn env_parse_present_invalid_returns_default() {
    unsafe { std::env::set_var("__LESSONBOARD_TEST_INVALID__", "lots") };
    let val: u16 = env_parse("__LESSONBOARD_TEST_INVALID__", 7);
    assert_eq!(val, 7);
    unsafe { std::env::remove_var("__LESSONBOARD_TEST_INVALID__") };
}

#[test]
fn default_config_matches_constants() {
    let config = Config::default();
    assert_eq!(config.port, DEFAULT_PORT);
    assert!(config.database_url.is_none());
    assert_eq!(config.db_max_connections, DEFAULT_DB_MAX_CONNECTIONS);
    assert_eq!(config.board_save_dir, PathBuf::from(DEFAULT_BOARD_SAVE_DIR));
    assert_eq!(config.client_queue_capacity, DEFAULT_CLIENT_QUEUE_CAPACITY);
    assert_eq!(config.send_timeout, Duration::from_millis(DEFAULT_SEND_TIMEOUT_MS));
}
