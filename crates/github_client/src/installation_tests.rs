use super::*;
use serde_json::from_str;

#[test]
fn test_account_type_from_github() {
    assert_eq!(
        AccountType::from_github(Some("Organization")),
        AccountType::Organization
    );
    assert_eq!(AccountType::from_github(Some("User")), AccountType::User);
    assert_eq!(AccountType::from_github(Some("Bot")), AccountType::User);
    assert_eq!(AccountType::from_github(None), AccountType::User);
}

#[test]
fn test_account_type_round_trips_through_str() {
    for account_type in [AccountType::Organization, AccountType::User] {
        let parsed: AccountType = account_type.as_str().parse().unwrap();
        assert_eq!(parsed, account_type);
    }
    assert!("Enterprise".parse::<AccountType>().is_err());
}

#[test]
fn test_installation_response_into_account() {
    let json_str = r#"{
        "id": 123,
        "account": {
            "login": "Acme",
            "id": 42,
            "type": "Organization"
        },
        "repository_selection": "selected"
    }"#;

    let response: InstallationResponse = from_str(json_str).unwrap();
    let account = response.into_account().unwrap();

    assert_eq!(account.login, "Acme");
    assert_eq!(account.account_type, AccountType::Organization);
}

#[test]
fn test_installation_response_without_account() {
    let response: InstallationResponse = from_str(r#"{"id": 123}"#).unwrap();
    assert!(response.into_account().is_none());
}

#[test]
fn test_installation_response_without_login() {
    let response: InstallationResponse =
        from_str(r#"{"id": 123, "account": {"type": "User"}}"#).unwrap();
    assert!(response.into_account().is_none());
}

#[test]
fn test_installation_response_with_non_string_login_fails_to_parse() {
    let result: Result<InstallationResponse, _> =
        from_str(r#"{"id": 123, "account": {"login": 17, "type": "User"}}"#);
    assert!(result.is_err());
}
