use super::*;
use adb_core::CoreError;

#[test]
fn test_try_this_names_config() {
    let hint = try_this(Path::new("local.yml"), "bootstrap");
    assert_eq!(hint, r#"Try this: "assembl-db-manage -c local.yml bootstrap""#);
}

#[test]
fn test_exit_code_has_empty_display() {
    assert_eq!(ExitCode(3).to_string(), "");
}

#[test]
fn test_multiple_heads_exit_with_2() {
    let err = MigrateError::Core(CoreError::MultipleHeads {
        heads: vec!["headA".to_string(), "headB".to_string()],
    });
    let err = exit_on_fatal_history(err);
    let code = err.downcast_ref::<ExitCode>().map(|c| c.0);
    assert_eq!(code, Some(EXIT_FATAL_HISTORY));
}

#[test]
fn test_other_errors_pass_through() {
    let err = MigrateError::NotInitialized {
        schema: "public".to_string(),
    };
    let err = exit_on_fatal_history(err);
    assert!(err.downcast_ref::<ExitCode>().is_none());
    assert!(err.to_string().contains("[M006]"));
}
