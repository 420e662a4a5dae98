//! LDAP client for the directory strategy.
//!
//! Authentication is a bind as the user: a service (or anonymous) bind finds
//! the unique entry matching the submitted username, then the submitted
//! password is checked by rebinding as that entry's DN. Group membership is
//! read from the entry's `memberOf` values.
//!
//! The protocol calls sit behind the [`DirectoryOps`] seam so the
//! lookup-bind-gate composition is testable against a canned directory.

use std::collections::HashMap;
use std::time::Duration;

use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry, ldap_escape};
use tracing::{debug, warn};

use crate::config::DirectoryConfig;
use crate::error::DirectoryError;
use authgate_access::DirectoryIdentity;

/// Attributes requested for the user entry.
const USER_ATTRS: &[&str] = &[
    "cn",
    "displayName",
    "mail",
    "sAMAccountName",
    "memberOf",
    "userPrincipalName",
];

/// A directory entry as returned by a search.
#[derive(Debug, Clone, Default)]
pub(crate) struct DirectoryEntry {
    /// Distinguished name of the entry.
    pub dn: String,
    /// Requested attributes, multi-valued, keyed as the server returned them.
    pub attrs: HashMap<String, Vec<String>>,
}

/// The protocol operations the authentication composition runs against.
///
/// [`LdapSession`] implements this over a live connection; tests substitute
/// a canned directory.
pub(crate) trait DirectoryOps {
    /// Binds as `dn`. `Ok(true)` on success, `Ok(false)` when the server
    /// rejected the credentials, `Err` on a transport or timeout failure.
    async fn bind(&mut self, dn: &str, password: &str) -> Result<bool, String>;

    /// Runs a subtree search and returns the matching entries.
    async fn search(
        &mut self,
        base: &str,
        filter: &str,
        attrs: &[&str],
    ) -> Result<Vec<DirectoryEntry>, String>;

    /// Closes the connection. Infallible; a failed close is logged only.
    async fn close(&mut self);
}

/// A live connection with a per-operation timeout.
///
/// Every bind and search is bounded, so a server that wedges after accepting
/// the connection fails the request instead of hanging it.
#[derive(Debug)]
struct LdapSession {
    ldap: Ldap,
    op_timeout: Duration,
}

impl DirectoryOps for LdapSession {
    async fn bind(&mut self, dn: &str, password: &str) -> Result<bool, String> {
        let result = self
            .ldap
            .with_timeout(self.op_timeout)
            .simple_bind(dn, password)
            .await
            .map_err(|e| e.to_string())?;
        Ok(result.success().is_ok())
    }

    async fn search(
        &mut self,
        base: &str,
        filter: &str,
        attrs: &[&str],
    ) -> Result<Vec<DirectoryEntry>, String> {
        let (entries, _) = self
            .ldap
            .with_timeout(self.op_timeout)
            .search(base, Scope::Subtree, filter, attrs)
            .await
            .map_err(|e| e.to_string())?
            .success()
            .map_err(|e| e.to_string())?;
        Ok(entries
            .into_iter()
            .map(|entry| {
                let entry = SearchEntry::construct(entry);
                DirectoryEntry {
                    dn: entry.dn,
                    attrs: entry.attrs,
                }
            })
            .collect())
    }

    async fn close(&mut self) {
        if let Err(err) = self.ldap.unbind().await {
            debug!(error = %err, "directory unbind failed");
        }
    }
}

/// A looked-up user entry with its group memberships.
#[derive(Debug, Clone)]
pub struct UserRecord {
    /// The normalized identity fields of the entry.
    pub identity: DirectoryIdentity,
    /// Group names the user belongs to: each `memberOf` value contributes
    /// its full DN and, when present, its leading CN fragment.
    pub groups: Vec<String>,
}

/// Client for the directory service.
#[derive(Debug)]
pub struct DirectoryClient {
    config: DirectoryConfig,
}

impl DirectoryClient {
    /// Creates a client over the given configuration.
    #[must_use]
    pub fn new(config: DirectoryConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    /// Verifies the submitted credentials and returns the user's identity.
    ///
    /// Lookup failures that would reveal whether the account exists are
    /// reported to the caller as [`DirectoryError::InvalidCredentials`]; the
    /// precise cause goes to the logs.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<DirectoryIdentity, DirectoryError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(DirectoryError::MissingCredentials);
        }

        let mut session = self.connect().await?;
        let result = self.verify_credentials(&mut session, username, password).await;
        // The connection is closed on every path, success or failure.
        session.close().await;
        result
    }

    /// Runs the lookup, credential bind, and group gate on one session,
    /// concealing account-existence detail from the caller.
    async fn verify_credentials<S: DirectoryOps>(
        &self,
        session: &mut S,
        username: &str,
        password: &str,
    ) -> Result<DirectoryIdentity, DirectoryError> {
        match self.authenticate_inner(session, username, password).await {
            Err(DirectoryError::NotFound) => {
                warn!(username, "login attempt for unknown directory user");
                Err(DirectoryError::InvalidCredentials)
            }
            Err(DirectoryError::AmbiguousMatch) => {
                warn!(username, "user search matched more than one entry");
                Err(DirectoryError::InvalidCredentials)
            }
            other => other,
        }
    }

    async fn authenticate_inner<S: DirectoryOps>(
        &self,
        session: &mut S,
        username: &str,
        password: &str,
    ) -> Result<DirectoryIdentity, DirectoryError> {
        if !self.config.bind_dn().is_empty() {
            let bound = session
                .bind(self.config.bind_dn(), self.config.bind_password())
                .await
                .map_err(DirectoryError::ServiceBindFailed)?;
            if !bound {
                return Err(DirectoryError::ServiceBindFailed(
                    "lookup bind rejected".to_string(),
                ));
            }
        }

        let record = self.lookup_user(session, username).await?;

        // The credential check is the bind itself.
        let bound = session
            .bind(&record.identity.distinguished_name, password)
            .await
            .map_err(DirectoryError::ConnectFailed)?;
        if !bound {
            return Err(DirectoryError::InvalidCredentials);
        }

        let allow_list = self.config.allow_list();
        if !allow_list.is_unrestricted() && !allow_list.permits_contains(&record.groups) {
            return Err(DirectoryError::AccessDenied);
        }

        Ok(record.identity)
    }

    /// Finds the unique directory entry for the username.
    async fn lookup_user<S: DirectoryOps>(
        &self,
        session: &mut S,
        username: &str,
    ) -> Result<UserRecord, DirectoryError> {
        let filter = build_user_filter(self.config.user_filter(), username);
        let mut entries = session
            .search(self.config.base_dn(), &filter, USER_ATTRS)
            .await
            .map_err(DirectoryError::SearchFailed)?;

        if entries.is_empty() {
            return Err(DirectoryError::NotFound);
        }
        if entries.len() > 1 {
            return Err(DirectoryError::AmbiguousMatch);
        }
        let entry = entries.remove(0);

        let account_name =
            attr_first(&entry, "sAMAccountName").unwrap_or_else(|| username.to_string());
        let display_name = attr_first(&entry, "displayName")
            .or_else(|| attr_first(&entry, "cn"))
            .unwrap_or_else(|| account_name.clone());
        let groups = extract_groups(&attr_all(&entry, "memberOf"));
        let email = attr_first(&entry, "mail").unwrap_or_default();
        let user_principal_name = attr_first(&entry, "userPrincipalName").unwrap_or_default();

        Ok(UserRecord {
            identity: DirectoryIdentity {
                distinguished_name: entry.dn,
                username: account_name,
                display_name,
                email,
                user_principal_name,
            },
            groups,
        })
    }

    /// Connects to the first reachable configured host.
    async fn connect(&self) -> Result<LdapSession, DirectoryError> {
        let urls = self.config.urls();
        if urls.is_empty() {
            return Err(DirectoryError::ConnectFailed(
                "no directory hosts configured".to_string(),
            ));
        }

        let timeout = Duration::from_secs(self.config.timeout_seconds());
        let mut last_error = String::new();
        for url in &urls {
            // Internal directory hosts commonly present certificates the
            // gateway host does not trust; verification is skipped on the
            // implicit-TLS path only.
            let settings = LdapConnSettings::new()
                .set_conn_timeout(timeout)
                .set_starttls(self.config.start_tls())
                .set_no_tls_verify(self.config.use_tls());
            match LdapConnAsync::with_settings(settings, url).await {
                Ok((conn, ldap)) => {
                    ldap3::drive!(conn);
                    debug!(%url, "directory connection established");
                    return Ok(LdapSession {
                        ldap,
                        op_timeout: timeout,
                    });
                }
                Err(err) => {
                    warn!(%url, error = %err, "directory host unreachable, trying next");
                    last_error = err.to_string();
                }
            }
        }
        Err(DirectoryError::ConnectFailed(last_error))
    }
}

/// Renders the search filter, escaping the username per RFC 4515.
fn build_user_filter(template: &str, username: &str) -> String {
    template.replace("{username}", ldap_escape(username).as_ref())
}

/// Flattens `memberOf` DNs into matchable group names.
///
/// Each DN contributes its leading CN value and the full DN, so allow lists
/// can name either form.
fn extract_groups(member_of: &[String]) -> Vec<String> {
    let mut groups = Vec::new();
    for dn in member_of {
        if let Some(first) = dn.split(',').next() {
            let mut parts = first.splitn(2, '=');
            if let (Some(attr), Some(value)) = (parts.next(), parts.next()) {
                if attr.trim().eq_ignore_ascii_case("cn") && !value.trim().is_empty() {
                    groups.push(value.trim().to_string());
                }
            }
        }
        groups.push(dn.clone());
    }
    groups
}

fn attr_first(entry: &DirectoryEntry, name: &str) -> Option<String> {
    entry
        .attrs
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .and_then(|(_, values)| values.first().cloned())
}

fn attr_all(entry: &DirectoryEntry, name: &str) -> Vec<String> {
    entry
        .attrs
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, values)| values.clone())
        .unwrap_or_default()
}
