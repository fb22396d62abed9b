use littleweb::config::Config;

// Env vars are process-wide, so the load-order assertions live in one test
// to keep them from racing each other.
#[test]
fn test_config_load_precedence() {
    unsafe {
        std::env::remove_var("LITTLEWEB_CONFIG");
        std::env::remove_var("LISTEN");
    }
    let cfg = Config::load();
    assert_eq!(cfg.listen_addr, "127.0.0.1:8080");

    unsafe {
        std::env::set_var("LISTEN", "0.0.0.0:3000");
    }
    let cfg = Config::load();
    assert_eq!(cfg.listen_addr, "0.0.0.0:3000");

    let path = std::env::temp_dir().join("littleweb-test-config.yaml");
    std::fs::write(&path, "listen_addr: \"127.0.0.1:9999\"\n").unwrap();
    unsafe {
        std::env::set_var("LITTLEWEB_CONFIG", &path);
    }
    let cfg = Config::load();
    assert_eq!(cfg.listen_addr, "127.0.0.1:9999");

    // A broken config file falls back to the env var.
    std::fs::write(&path, "listen_addr: [not a string\n").unwrap();
    let cfg = Config::load();
    assert_eq!(cfg.listen_addr, "0.0.0.0:3000");

    unsafe {
        std::env::remove_var("LITTLEWEB_CONFIG");
        std::env::remove_var("LISTEN");
    }
    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_config_default() {
    let cfg = Config::default();
    assert_eq!(cfg.listen_addr, "127.0.0.1:8080");
}

#[test]
fn test_config_clone() {
    let cfg1 = Config::default();
    let cfg2 = cfg1.clone();
    assert_eq!(cfg1.listen_addr, cfg2.listen_addr);
}
