use std::env;

use serial_test::serial;

use murmur::config::{parse_llm_provider_model, Config, KNOWN_LLM_PROVIDERS};
use murmur::error::MurmurError;

fn clear(keys: &[&str]) {
    for key in keys {
        env::remove_var(key);
    }
}

#[test]
fn test_llm_model_prefixes() {
    assert_eq!(parse_llm_provider_model("openai/gpt-4o"), ("openai", "gpt-4o"));
    assert_eq!(
        parse_llm_provider_model("openrouter/anthropic/claude-3.5-sonnet"),
        ("openrouter", "anthropic/claude-3.5-sonnet")
    );
    assert_eq!(parse_llm_provider_model("llama3"), ("local", "llama3"));
    assert_eq!(
        parse_llm_provider_model("unknown/model-name"),
        ("local", "unknown/model-name")
    );
    assert!(KNOWN_LLM_PROVIDERS.contains(&"ollama"));
}

#[test]
#[serial]
fn test_full_config_from_env_validates() {
    env::set_var("SOCIAL_NETWORK_URL", "http://social.test/");
    env::set_var("SOCIAL_NETWORK_API_KEY", "k3y");
    env::set_var("LLM_MODEL", "ollama/llama3.2");
    env::set_var("TEMPERATURE", "0.9");
    env::set_var("MURMUR_API_KEYS", "a, b,,");

    let config = Config::from_env();
    assert!(config.validate().is_ok());
    assert_eq!(config.server.api_keys, vec!["a", "b"]);
    let llm = config.llm.as_ref().unwrap();
    assert_eq!(llm.model, "ollama/llama3.2");
    assert!((llm.temperature - 0.9).abs() < f32::EPSILON);

    clear(&[
        "SOCIAL_NETWORK_URL",
        "SOCIAL_NETWORK_API_KEY",
        "LLM_MODEL",
        "TEMPERATURE",
        "MURMUR_API_KEYS",
    ]);
}

#[test]
#[serial]
fn test_missing_social_settings_fail_validation() {
    clear(&["SOCIAL_NETWORK_URL", "SOCIAL_NETWORK_API_KEY"]);
    env::set_var("LLM_MODEL", "openai/gpt-4o-mini");

    let err = Config::from_env().validate().unwrap_err();
    let MurmurError::Configuration(message) = err else {
        panic!("expected a configuration error");
    };
    assert!(message.contains("SOCIAL_NETWORK_URL"));
    assert!(message.contains("SOCIAL_NETWORK_API_KEY"));

    clear(&["LLM_MODEL"]);
}

#[test]
#[serial]
fn test_scheduler_intervals_from_env() {
    env::set_var("MONITORING_INTERVAL", "15");
    env::set_var("SYNC_INTERVAL", "600");
    env::set_var("INITIAL_RESEED_DELAY", "bogus");

    let config = Config::from_env();
    assert_eq!(config.scheduler.monitoring_interval_secs, 15);
    assert_eq!(config.scheduler.sync_interval_secs, 600);
    assert_eq!(config.scheduler.initial_reseed_delay_secs, 86400);

    clear(&["MONITORING_INTERVAL", "SYNC_INTERVAL", "INITIAL_RESEED_DELAY"]);
}
