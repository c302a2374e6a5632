//! User accounts: the `name://Users` collection and its `User` records.
//!
//! Authorization levels used below:
//!
//! | Level        | Caller must be                                 |
//! |--------------|------------------------------------------------|
//! | owner        | the user itself                                |
//! | owner-plus   | the user itself, or an `Admin`/`Server` caller |
//! | server-plus  | a `Server` or `Admin` caller                   |
//! | admin        | an `Admin` caller                              |

use super::credential::{PasswordCredential, CREDENTIALS_PROPERTY};
use super::ledger::{Ledger, SharedLedger};
use crate::config::ApiConfig;
use crate::error::DispatchError;
use crate::object::{ObjectRef, PersistedObject, Properties};
use crate::registry::{ActionArgs, ActionContext, ActionRegistry, ActionResult};
use crate::security::{
    SecurityContext, UserRef, ROLE_ADMIN, ROLE_PROPERTY, ROLE_SERVER, ROLE_USER,
};
use crate::store::{filter_eq, Filter};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

/// Owner type of `name://Users`.
pub const USERS_COLLECTION: &str = "CollectionUsers";
/// Record type of users.
pub const USER_TYPE: &str = "User";
/// View table of users.
pub const USER_VIEW: &str = "UserView";

const PRIVILEGED: &[&str] = &[ROLE_ADMIN, ROLE_SERVER];

const USERNAME: &str = "Username";
const ACCOUNT: &str = "Account";
const TEST_TOKENS_ISSUED: &str = "TestTokensIssued";

type ActionOutcome = Result<ActionResult, DispatchError>;

pub(super) fn register(
    registry: &mut ActionRegistry,
    config: &ApiConfig,
    ledger: SharedLedger,
) -> Result<(), DispatchError> {
    registry.register(USERS_COLLECTION, "CreateUser", &["username", "password"], create_user)?;
    registry.register(USERS_COLLECTION, "FindUser", &["username"], find_user)?;
    registry.register_bare(USERS_COLLECTION, "CountUsers", count_users)?;

    registry.register_bare(USER_TYPE, "GetUserName", get_user_name)?;
    registry.register(USER_TYPE, "SetPassword", &["password"], set_password)?;
    registry.register(
        USER_TYPE,
        "ChangePassword",
        &["oldPassword", "newPassword"],
        change_password,
    )?;
    registry.register(USER_TYPE, "LoginPassword", &["password"], login_password)?;
    registry.register_bare(USER_TYPE, "GetRole", get_role)?;
    registry.register(USER_TYPE, "SetRole", &["role"], set_role)?;
    registry.register_bare(USER_TYPE, "GetAccount", get_account)?;

    let l = Arc::clone(&ledger);
    registry.register_bare(USER_TYPE, "CreateAccount", move |ctx, _| create_account(ctx, &*l))?;
    let l = Arc::clone(&ledger);
    registry.register_bare(USER_TYPE, "GetBalance", move |ctx, _| get_balance(ctx, &*l))?;
    let amount = config.issue_test_tokens;
    registry.register_bare(USER_TYPE, "IssueTestTokens", move |ctx, _| {
        issue_test_tokens(ctx, &*ledger, amount)
    })?;

    registry.register_view_model(USER_VIEW, user_view_model);
    Ok(())
}

/// Check an authorization level against the resolved object, then hand out
/// the user record.
fn authorized<'c>(
    ctx: &'c mut ActionContext<'_>,
    check: impl FnOnce(&SecurityContext, &str) -> Result<(), DispatchError>,
) -> Result<&'c mut PersistedObject, DispatchError> {
    let path = ctx.object.path().to_string();
    check(&*ctx.security, &path)?;
    ctx.persisted()
}

fn owner(security: &SecurityContext, path: &str) -> Result<(), DispatchError> {
    security.verify_owner(path)
}

fn owner_plus(security: &SecurityContext, path: &str) -> Result<(), DispatchError> {
    security.verify_owner_or_role(path, PRIVILEGED)
}

fn server_plus(security: &SecurityContext, _path: &str) -> Result<(), DispatchError> {
    security.verify_role(PRIVILEGED)
}

fn validate_username(username: &str) -> Result<(), DispatchError> {
    if username.is_empty() || username.contains('/') {
        return Err(DispatchError::InvalidArgument("username".into()));
    }
    Ok(())
}

fn store_password(user: &mut PersistedObject, password: &str) -> Result<(), DispatchError> {
    let credential = PasswordCredential::new(password)?;
    let credentials = credential.merge_into(user.get_property(CREDENTIALS_PROPERTY))?;
    user.set_property(CREDENTIALS_PROPERTY, credentials)
}

fn property(user: &PersistedObject, key: &str) -> Value {
    user.get_property(key).cloned().unwrap_or(Value::Null)
}

fn create_user(ctx: &mut ActionContext<'_>, args: ActionArgs) -> ActionOutcome {
    let username = args.text(0)?;
    validate_username(&username)?;
    let password = args.text(1)?;
    let credential = PasswordCredential::new(&password)?;

    let users = ctx.collection()?;
    let path = format!("{}/{username}", users.path());
    let mut props = Properties::new();
    props.insert(USERNAME.into(), json!(username));
    props.insert(ROLE_PROPERTY.into(), json!(ROLE_USER));
    props.insert(CREDENTIALS_PROPERTY.into(), credential.merge_into(None)?);
    users.add_child(USER_TYPE, &path, props)?;

    info!(path = %path, "User created");
    Ok(ObjectRef {
        type_name: USER_TYPE.into(),
        path,
    }
    .into())
}

fn find_user(ctx: &mut ActionContext<'_>, args: ActionArgs) -> ActionOutcome {
    let username = args.text(0)?;
    let filter: Filter = filter_eq(&format!("Properties.{USERNAME}"), username.as_str());
    let record = ctx
        .collection()?
        .get_children(&filter, 0, 1)?
        .into_iter()
        .next()
        .ok_or(DispatchError::ObjectNotFound(username))?;
    Ok(ObjectRef {
        type_name: record.type_name.unwrap_or_default(),
        path: record.path,
    }
    .into())
}

fn count_users(ctx: &mut ActionContext<'_>, _args: ActionArgs) -> ActionOutcome {
    let count = ctx.collection()?.get_child_count(&Filter::new())?;
    Ok(json!(count).into())
}

fn get_user_name(ctx: &mut ActionContext<'_>, _args: ActionArgs) -> ActionOutcome {
    let user = authorized(ctx, owner_plus)?;
    Ok(property(user, USERNAME).into())
}

fn set_password(ctx: &mut ActionContext<'_>, args: ActionArgs) -> ActionOutcome {
    let user = authorized(ctx, server_plus)?;
    store_password(user, &args.text(0)?)?;
    Ok(json!(true).into())
}

fn change_password(ctx: &mut ActionContext<'_>, args: ActionArgs) -> ActionOutcome {
    let user = authorized(ctx, owner_plus)?;
    let old = args.text(0)?;
    let current = PasswordCredential::find(user.get_property(CREDENTIALS_PROPERTY));
    if !current.is_some_and(|c| c.verify(&old)) {
        return Err(DispatchError::InvalidArgument("oldPassword".into()));
    }
    store_password(user, &args.text(1)?)?;
    info!(path = %user.path(), "Password changed");
    Ok(json!(true).into())
}

fn login_password(ctx: &mut ActionContext<'_>, args: ActionArgs) -> ActionOutcome {
    let password = args.text(0)?;
    let user = ctx.persisted()?;
    let verified = PasswordCredential::find(user.get_property(CREDENTIALS_PROPERTY))
        .is_some_and(|c| c.verify(&password));
    if !verified {
        info!(path = %user.path(), "Login rejected");
        return Err(DispatchError::InvalidCredential(user.path().to_string()));
    }

    let identity = UserRef {
        path: user.path().to_string(),
        role: user.get_property(ROLE_PROPERTY).and_then(Value::as_str).map(str::to_string),
    };
    let token = ctx.tokens.issue(Some(&identity))?;
    info!(path = %identity.path, "User logged in");
    *ctx.security = SecurityContext::authenticated(identity);
    ctx.set_token_cookie(token.clone());
    Ok(json!(token).into())
}

fn get_role(ctx: &mut ActionContext<'_>, _args: ActionArgs) -> ActionOutcome {
    let user = authorized(ctx, owner_plus)?;
    Ok(property(user, ROLE_PROPERTY).into())
}

fn set_role(ctx: &mut ActionContext<'_>, args: ActionArgs) -> ActionOutcome {
    let user = authorized(ctx, |s, _| s.verify_role(&[ROLE_ADMIN]))?;
    let role = args.text(0)?;
    if role.is_empty() {
        return Err(DispatchError::InvalidArgument("role".into()));
    }
    user.set_property(ROLE_PROPERTY, json!(role))?;
    info!(path = %user.path(), role = %role, "Role changed");
    Ok(ActionResult::none())
}

fn get_account(ctx: &mut ActionContext<'_>, _args: ActionArgs) -> ActionOutcome {
    let user = authorized(ctx, owner_plus)?;
    Ok(property(user, ACCOUNT).into())
}

fn create_account(ctx: &mut ActionContext<'_>, ledger: &dyn Ledger) -> ActionOutcome {
    let user = authorized(ctx, owner)?;
    if user.has_property(ACCOUNT) {
        return Err(DispatchError::AlreadyExist(format!("{}: {ACCOUNT}", user.path())));
    }
    let account = ledger.new_account()?;
    user.set_property(ACCOUNT, json!(account))?;
    Ok(json!(account).into())
}

fn account_of(user: &PersistedObject) -> Result<String, DispatchError> {
    user.get_property(ACCOUNT)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            DispatchError::InvalidOperation(
                "No wallet account is associated with this user.".into(),
            )
        })
}

fn get_balance(ctx: &mut ActionContext<'_>, ledger: &dyn Ledger) -> ActionOutcome {
    let user = authorized(ctx, owner)?;
    let account = account_of(user)?;
    Ok(json!(ledger.balance(&account)?).into())
}

fn issue_test_tokens(
    ctx: &mut ActionContext<'_>,
    ledger: &dyn Ledger,
    amount: u64,
) -> ActionOutcome {
    let user = authorized(ctx, owner)?;
    let already_issued = user
        .get_property(TEST_TOKENS_ISSUED)
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if amount == 0 || already_issued {
        return Err(DispatchError::NotSupported("IssueTestTokens".into()));
    }
    let account = account_of(user)?;
    let balance = ledger.issue(&account, amount)?;
    user.set_property(TEST_TOKENS_ISSUED, json!(true))?;
    Ok(json!(balance).into())
}

fn user_view_model(ctx: &mut ActionContext<'_>, _args: ActionArgs) -> ActionOutcome {
    let user = authorized(ctx, owner_plus)?;
    let mut model = Properties::new();
    for key in [USERNAME, ROLE_PROPERTY, ACCOUNT] {
        model.insert(key.to_string(), property(user, key));
    }
    Ok(json!({
        "Path": user.path(),
        "Type": USER_TYPE,
        "Model": model,
    })
    .into())
}
