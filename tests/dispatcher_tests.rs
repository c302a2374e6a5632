mod common;

use common::{call, call_as, memory_dispatcher, signup, test_config};
use objrouter::app::token_manager;
use objrouter::args::RequestArgs;
use objrouter::dispatcher::DispatchRequest;
use objrouter::security::UserRef;
use serde_json::json;
use std::collections::HashMap;

#[test]
fn test_missing_record_is_object_not_found() {
    let (d, _) = memory_dispatcher(&test_config());
    let resp = call(&d, "/api/name/Hosts/abc123/GetBalance", &[]);
    assert_eq!(resp.status, 404);
    assert_eq!(resp.body["Type"], "Error");
    assert_eq!(resp.body["Code"], 3);
    assert!(resp.body["Message"]
        .as_str()
        .unwrap()
        .contains("name://Hosts/abc123"));
}

#[test]
fn test_short_paths_are_invalid() {
    let (d, _) = memory_dispatcher(&test_config());
    for path in ["/api/system/Info", "api/system/Info/GetTime/x", "/"] {
        let resp = call(&d, path, &[]);
        assert_eq!(resp.body["Code"], 2, "{path}");
    }
}

#[test]
fn test_system_info() {
    let (d, _) = memory_dispatcher(&test_config());
    let version = call(&d, "/api/system/Info/GetVersion", &[]);
    assert_eq!(version.body, json!(env!("CARGO_PKG_VERSION")));
    let time = call(&d, "/api/system/Info/GetTime", &[]);
    assert!(time.body.as_u64().unwrap() > 1_600_000_000);
    let describe = call(&d, "/api/system/Info/", &[]);
    assert_eq!(describe.body, json!({"Type": "SystemInfo", "Path": "system://Info"}));
}

#[test]
fn test_unknown_scheme_is_invalid() {
    let (d, _) = memory_dispatcher(&test_config());
    let resp = call(&d, "/api/file/etc/passwd/Read", &[]);
    assert_eq!(resp.body["Code"], 2);
}

#[test]
fn test_create_user_returns_descriptor_and_persists() {
    let (d, _) = memory_dispatcher(&test_config());
    let created = call(
        &d,
        "/api/name/Users/CreateUser",
        &[("username", "alice"), ("password", "hunter2")],
    );
    assert_eq!(created.body, json!({"Type": "User", "Path": "name://Users/alice"}));

    let describe = call(&d, "/api/name/Users/alice/", &[]);
    assert_eq!(describe.body, json!({"Type": "User", "Path": "name://Users/alice"}));

    let again = call(
        &d,
        "/api/name/Users/CreateUser",
        &[("username", "alice"), ("password", "other")],
    );
    assert_eq!(again.status, 409);
    assert_eq!(again.body["Code"], 4);
}

#[test]
fn test_create_user_validates_arguments() {
    let (d, _) = memory_dispatcher(&test_config());
    let no_password = call(&d, "/api/name/Users/CreateUser", &[("username", "bob")]);
    assert_eq!(no_password.body["Code"], 2);
    assert!(no_password.body["Message"].as_str().unwrap().contains("password"));

    let count = call(&d, "/api/name/Users/CountUsers", &[]);
    assert_eq!(count.body, json!(0));
}

#[test]
fn test_numeric_password_survives_coercion() {
    let (d, _) = memory_dispatcher(&test_config());
    let token = signup(&d, "carol", "12345");
    assert!(!token.is_empty());
}

#[test]
fn test_text_arguments_are_not_reformatted() {
    let (d, _) = memory_dispatcher(&test_config());
    let created = call(
        &d,
        "/api/name/Users/CreateUser",
        &[("username", "1e3"), ("password", "1e1")],
    );
    assert_eq!(created.body["Path"], "name://Users/1e3");

    let lookalike = call(&d, "/api/name/Users/1e3/LoginPassword", &[("password", "10.0")]);
    assert_eq!(lookalike.body["Code"], 6);
    let login = call(&d, "/api/name/Users/1e3/LoginPassword", &[("password", "1e1")]);
    assert_eq!(login.status, 200);

    let null_name = call(
        &d,
        "/api/name/Users/CreateUser",
        &[("username", "null"), ("password", "pw")],
    );
    assert_eq!(null_name.body["Path"], "name://Users/null");
}

#[test]
fn test_find_and_count_users() {
    let (d, _) = memory_dispatcher(&test_config());
    signup(&d, "alice", "a");
    signup(&d, "bob", "b");

    let found = call(&d, "/api/name/Users/FindUser", &[("username", "bob")]);
    assert_eq!(found.body, json!({"Type": "User", "Path": "name://Users/bob"}));
    let missing = call(&d, "/api/name/Users/FindUser", &[("username", "zed")]);
    assert_eq!(missing.body["Code"], 3);
    assert_eq!(call(&d, "/api/name/Users/CountUsers", &[]).body, json!(2));
}

#[test]
fn test_login_sets_token_cookie() {
    let (d, _) = memory_dispatcher(&test_config());
    call(
        &d,
        "/api/name/Users/CreateUser",
        &[("username", "alice"), ("password", "hunter2")],
    );
    let login = call(
        &d,
        "/api/name/Users/alice/LoginPassword",
        &[("password", "hunter2")],
    );
    assert_eq!(login.status, 200);
    assert_eq!(login.cookies.len(), 1);
    assert_eq!(login.cookies[0].name, "st");
    assert_eq!(json!(login.cookies[0].value), login.body);

    let bad = call(&d, "/api/name/Users/alice/LoginPassword", &[("password", "nope")]);
    assert_eq!(bad.status, 401);
    assert_eq!(bad.body["Code"], 6);
    assert!(bad.cookies.is_empty());
}

#[test]
fn test_owner_actions_require_identity() {
    let (d, _) = memory_dispatcher(&test_config());
    let alice = signup(&d, "alice", "pw-a");
    let bob = signup(&d, "bob", "pw-b");

    let anonymous = call(&d, "/api/name/Users/alice/GetUserName", &[]);
    assert_eq!(anonymous.body["Code"], 6);

    let other = call_as(&d, &bob, "/api/name/Users/alice/GetUserName", &[]);
    assert_eq!(other.status, 403);
    assert_eq!(other.body["Code"], 9);

    let own = call_as(&d, &alice, "/api/name/Users/alice/GetUserName", &[]);
    assert_eq!(own.body, json!("alice"));
    let role = call_as(&d, &alice, "/api/name/Users/alice/GetRole", &[]);
    assert_eq!(role.body, json!("User"));
}

#[test]
fn test_change_password() {
    let (d, _) = memory_dispatcher(&test_config());
    let token = signup(&d, "alice", "old-pw");

    let wrong = call_as(
        &d,
        &token,
        "/api/name/Users/alice/ChangePassword",
        &[("oldPassword", "guess"), ("newPassword", "new-pw")],
    );
    assert_eq!(wrong.body["Code"], 2);
    assert!(wrong.body["Message"].as_str().unwrap().contains("oldPassword"));

    let ok = call_as(
        &d,
        &token,
        "/api/name/Users/alice/ChangePassword",
        &[("oldPassword", "old-pw"), ("newPassword", "new-pw")],
    );
    assert_eq!(ok.body, json!(true));

    let old_login = call(&d, "/api/name/Users/alice/LoginPassword", &[("password", "old-pw")]);
    assert_eq!(old_login.body["Code"], 6);
    let new_login = call(&d, "/api/name/Users/alice/LoginPassword", &[("password", "new-pw")]);
    assert_eq!(new_login.status, 200);
}

#[test]
fn test_role_changes_are_admin_only() {
    let config = test_config();
    let (d, _) = memory_dispatcher(&config);
    let alice = signup(&d, "alice", "pw");

    let denied = call_as(&d, &alice, "/api/name/Users/alice/SetRole", &[("role", "Admin")]);
    assert_eq!(denied.body["Code"], 9);

    let admin = token_manager(&config)
        .issue(Some(&UserRef {
            path: "name://Users/root".into(),
            role: Some("Admin".into()),
        }))
        .unwrap();
    let granted = call_as(&d, &admin, "/api/name/Users/alice/SetRole", &[("role", "Server")]);
    assert_eq!(granted.status, 200);

    let role = call_as(&d, &admin, "/api/name/Users/alice/GetRole", &[]);
    assert_eq!(role.body, json!("Server"));
}

#[test]
fn test_set_password_is_server_only() {
    let config = test_config();
    let (d, _) = memory_dispatcher(&config);
    let alice = signup(&d, "alice", "pw");
    let denied = call_as(&d, &alice, "/api/name/Users/alice/SetPassword", &[("password", "x")]);
    assert_eq!(denied.body["Code"], 9);

    let server = token_manager(&config)
        .issue(Some(&UserRef {
            path: "name://Services/billing".into(),
            role: Some("Server".into()),
        }))
        .unwrap();
    let reset = call_as(&d, &server, "/api/name/Users/alice/SetPassword", &[("password", "reset")]);
    assert_eq!(reset.body, json!(true));
    let login = call(&d, "/api/name/Users/alice/LoginPassword", &[("password", "reset")]);
    assert_eq!(login.status, 200);
}

#[test]
fn test_wallet_account_flow() {
    let (d, _) = memory_dispatcher(&test_config());
    let token = signup(&d, "alice", "pw");

    let no_account = call_as(&d, &token, "/api/name/Users/alice/GetBalance", &[]);
    assert_eq!(no_account.body["Code"], 8);

    let account = call_as(&d, &token, "/api/name/Users/alice/CreateAccount", &[]);
    assert!(account.body.as_str().unwrap().starts_with("acct_"));
    let twice = call_as(&d, &token, "/api/name/Users/alice/CreateAccount", &[]);
    assert_eq!(twice.body["Code"], 4);

    let got = call_as(&d, &token, "/api/name/Users/alice/GetAccount", &[]);
    assert_eq!(got.body, account.body);
    assert_eq!(
        call_as(&d, &token, "/api/name/Users/alice/GetBalance", &[]).body,
        json!(0)
    );

    let issued = call_as(&d, &token, "/api/name/Users/alice/IssueTestTokens", &[]);
    assert_eq!(issued.body, json!(1000));
    let again = call_as(&d, &token, "/api/name/Users/alice/IssueTestTokens", &[]);
    assert_eq!(again.body["Code"], 5);
    assert_eq!(
        call_as(&d, &token, "/api/name/Users/alice/GetBalance", &[]).body,
        json!(1000)
    );
}

#[test]
fn test_test_tokens_disabled_by_default() {
    let mut config = test_config();
    config.apis.issue_test_tokens = 0;
    let (d, _) = memory_dispatcher(&config);
    let token = signup(&d, "alice", "pw");
    call_as(&d, &token, "/api/name/Users/alice/CreateAccount", &[]);
    let resp = call_as(&d, &token, "/api/name/Users/alice/IssueTestTokens", &[]);
    assert_eq!(resp.status, 501);
}

#[test]
fn test_unknown_and_private_actions() {
    let (d, _) = memory_dispatcher(&test_config());
    let token = signup(&d, "alice", "pw");
    let unknown = call_as(&d, &token, "/api/name/Users/alice/Explode", &[]);
    assert_eq!(unknown.body["Code"], 5);
    for action in ["setPassword", "__proto__", "flush"] {
        let resp = call_as(&d, &token, &format!("/api/name/Users/alice/{action}"), &[]);
        assert_eq!(resp.body["Code"], 2, "{action}");
    }
}

#[test]
fn test_expiring_token_is_renewed_with_same_identity() {
    let mut config = test_config();
    config.security.token_lifetime_secs = 300;
    let (d, _) = memory_dispatcher(&config);
    let token = signup(&d, "alice", "pw");

    let resp = call_as(&d, &token, "/api/name/Users/alice/GetUserName", &[]);
    assert_eq!(resp.body, json!("alice"));
    assert_eq!(resp.cookies.len(), 1);
    let renewed = d.tokens().parse(&resp.cookies[0].value).unwrap();
    assert_eq!(renewed.user.unwrap().path, "name://Users/alice");
}

#[test]
fn test_renewal_cookie_survives_action_failure() {
    let mut config = test_config();
    config.security.token_lifetime_secs = 300;
    let (d, _) = memory_dispatcher(&config);
    let token = signup(&d, "alice", "pw");
    let resp = call_as(&d, &token, "/api/name/Users/alice/Nope", &[]);
    assert_eq!(resp.body["Code"], 5);
    assert_eq!(resp.cookies.len(), 1);
}

#[test]
fn test_expiring_token_is_renewed_once() {
    let mut config = test_config();
    config.security.token_lifetime_secs = 300;
    let (d, _) = memory_dispatcher(&config);
    let token = signup(&d, "alice", "pw");

    let first = call_as(&d, &token, "/api/name/Users/alice/GetUserName", &[]);
    assert_eq!(first.cookies.len(), 1);
    for _ in 0..3 {
        let resp = call_as(&d, &token, "/api/name/Users/alice/GetUserName", &[]);
        assert_eq!(resp.body, json!("alice"));
        assert!(resp.cookies.is_empty());
    }

    let renewed = first.cookies[0].value.as_str();
    let next = call_as(&d, renewed, "/api/name/Users/alice/GetUserName", &[]);
    assert_eq!(next.cookies.len(), 1);
    assert_ne!(next.cookies[0].value, renewed);
}

#[test]
fn test_demotion_applies_to_live_and_renewed_tokens() {
    let mut config = test_config();
    config.security.token_lifetime_secs = 300;
    let (d, _) = memory_dispatcher(&config);
    let ops = token_manager(&config)
        .issue(Some(&UserRef {
            path: "name://Users/ops".into(),
            role: Some("Admin".into()),
        }))
        .unwrap();
    signup(&d, "root", "pw");
    signup(&d, "alice", "pw");
    let promoted = call_as(&d, &ops, "/api/name/Users/root/SetRole", &[("role", "Admin")]);
    assert_eq!(promoted.status, 200);

    let login = call(&d, "/api/name/Users/root/LoginPassword", &[("password", "pw")]);
    let admin_token = login.body.as_str().unwrap().to_string();
    let granted = call_as(
        &d,
        &admin_token,
        "/api/name/Users/alice/SetRole",
        &[("role", "Server")],
    );
    assert_eq!(granted.status, 200);
    assert_eq!(granted.cookies.len(), 1);
    let renewed = granted.cookies[0].value.clone();
    assert_eq!(
        d.tokens().parse(&renewed).unwrap().user.unwrap().role.as_deref(),
        Some("Admin")
    );

    let demoted = call_as(&d, &ops, "/api/name/Users/root/SetRole", &[("role", "User")]);
    assert_eq!(demoted.status, 200);

    let denied = call_as(&d, &renewed, "/api/name/Users/alice/SetRole", &[("role", "Admin")]);
    assert_eq!(denied.body["Code"], 9);
    assert_eq!(denied.cookies.len(), 1);
    let reissued = d.tokens().parse(&denied.cookies[0].value).unwrap();
    assert_eq!(reissued.user.unwrap().role.as_deref(), Some("User"));

    let stale = call_as(&d, &admin_token, "/api/name/Users/alice/SetRole", &[("role", "Admin")]);
    assert_eq!(stale.body["Code"], 9);
    assert!(stale.cookies.is_empty());
}

#[test]
fn test_token_from_other_secret_is_rejected() {
    let (d, _) = memory_dispatcher(&test_config());
    let foreign = objrouter::security::SecurityTokenManager::new("someone-else")
        .issue(None)
        .unwrap();
    let resp = call_as(&d, &foreign, "/api/system/Info/GetTime", &[]);
    assert_eq!(resp.body["Code"], 6);
}

#[test]
fn test_user_view_model_and_default_view() {
    let (d, _) = memory_dispatcher(&test_config());
    let token = signup(&d, "alice", "pw");

    let view = call_as(&d, &token, "/view/name/Users/alice/", &[]);
    assert_eq!(view.body["Path"], "name://Users/alice");
    assert_eq!(view.body["Model"]["Username"], "alice");
    assert_eq!(view.body["Model"]["Role"], "User");

    let system = call(&d, "/view/system/Info/", &[]);
    assert_eq!(
        system.body,
        json!({"Path": "system://Info", "Type": "SystemInfo", "Model": {}})
    );

    let missing_action = call(&d, "/view/system/Info/Render", &[]);
    assert_eq!(missing_action.body["Code"], 5);
}

#[test]
fn test_body_values_override_query_and_cookies() {
    let (d, _) = memory_dispatcher(&test_config());
    signup(&d, "alice", "pw");

    let cookies = HashMap::from([("username".to_string(), "nobody".to_string())]);
    let query = HashMap::from([("username".to_string(), "ghost".to_string())]);
    let body = json!({"username": "alice"});
    let args = RequestArgs::merge(&cookies, &query, Some(&body));
    let resp = d.dispatch(&DispatchRequest::new(
        http::Method::POST,
        "/api/name/Users/FindUser",
        args,
    ));
    assert_eq!(resp.body["Path"], "name://Users/alice");
}
