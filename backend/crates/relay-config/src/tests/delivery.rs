use crate::Config;
use crate::tests::{EnvGuard, setup_config_dir};

use googletest::assert_that;
use googletest::prelude::{anything, err, ok};
use serial_test::serial;

// =========================================================================
// Validation Tests - Delivery
// =========================================================================

#[test]
#[serial]
fn given_frame_limit_below_payload_budget_when_validate_then_error() {
    // Given
    let (_temp, _guard) = setup_config_dir();
    let _payload = EnvGuard::set("RELAY_DELIVERY_MAX_PAYLOAD_LENGTH", "8192");
    let _frame = EnvGuard::set("RELAY_DELIVERY_MAX_FRAME_LENGTH", "4096");

    // When
    let config = Config::load().unwrap();
    let result = config.validate();

    // Then
    assert_that!(result, err(anything()));
}

#[test]
#[serial]
fn given_payload_budget_too_small_when_validate_then_error() {
    // Given
    let (_temp, _guard) = setup_config_dir();
    let _payload = EnvGuard::set("RELAY_DELIVERY_MAX_PAYLOAD_LENGTH", "16");

    // When
    let config = Config::load().unwrap();
    let result = config.validate();

    // Then
    assert_that!(result, err(anything()));
}

#[test]
#[serial]
fn given_equal_budget_and_frame_limit_when_validate_then_ok() {
    // Given
    let (_temp, _guard) = setup_config_dir();
    let _payload = EnvGuard::set("RELAY_DELIVERY_MAX_PAYLOAD_LENGTH", "4096");
    let _frame = EnvGuard::set("RELAY_DELIVERY_MAX_FRAME_LENGTH", "4096");

    // When
    let config = Config::load().unwrap();
    let result = config.validate();

    // Then
    assert_that!(result, ok(anything()));
}
