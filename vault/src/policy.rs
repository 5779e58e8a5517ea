//! Policies, `AppRole` roles and their secret ids.

use crate::{
    client::{LOG_TARGET, Vault},
    error::{VaultError, VaultResult},
    models::{RoleIdData, SecretIdData, SecretIdInfo},
};
use reqwest::Method;
use secrecy::SecretString;
use std::path::Path;
use tracing::{debug, info, instrument};

/// Settings of an `AppRole` role. Unset fields are left to Vault's defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppRoleOptions {
    /// Incremental token lifetime, as a duration string such as `"5m"`
    pub token_ttl: Option<String>,
    /// Maximum token lifetime, as a duration string
    pub token_max_ttl: Option<String>,
    /// Policies attached to issued tokens
    pub policies: Vec<String>,
    /// Networks allowed to use issued tokens
    pub cidrs: Vec<String>,
    /// Renewal period of issued tokens, as a duration string
    pub token_period: Option<String>,
}

impl AppRoleOptions {
    /// Set the token TTL.
    #[must_use]
    pub fn with_token_ttl(mut self, ttl: impl Into<String>) -> Self {
        self.token_ttl = Some(ttl.into());
        self
    }

    /// Set the maximum token TTL.
    #[must_use]
    pub fn with_token_max_ttl(mut self, ttl: impl Into<String>) -> Self {
        self.token_max_ttl = Some(ttl.into());
        self
    }

    /// Set the attached policies.
    #[must_use]
    pub fn with_policies<I, S>(mut self, policies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.policies = policies.into_iter().map(Into::into).collect();
        self
    }

    /// Set the bound CIDR blocks.
    #[must_use]
    pub fn with_cidrs<I, S>(mut self, cidrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cidrs = cidrs.into_iter().map(Into::into).collect();
        self
    }

    /// Set the token period.
    #[must_use]
    pub fn with_token_period(mut self, period: impl Into<String>) -> Self {
        self.token_period = Some(period.into());
        self
    }

    fn to_body(&self) -> serde_json::Value {
        let mut body = serde_json::Map::new();
        body.insert("bind_secret_id".into(), true.into());
        if let Some(ttl) = &self.token_ttl {
            body.insert("token_ttl".into(), ttl.clone().into());
        }
        if let Some(ttl) = &self.token_max_ttl {
            body.insert("token_max_ttl".into(), ttl.clone().into());
        }
        if !self.policies.is_empty() {
            body.insert("token_policies".into(), self.policies.clone().into());
        }
        if !self.cidrs.is_empty() {
            body.insert("token_bound_cidrs".into(), self.cidrs.clone().into());
        }
        if let Some(period) = &self.token_period {
            body.insert("token_period".into(), period.clone().into());
        }
        body.into()
    }
}

/// Substitute `{name}` placeholders in a policy template.
///
/// `{{` and `}}` stand for literal braces, which HCL policies need.
///
/// # Errors
///
/// Returns [`VaultError::PolicyTemplate`] for an unknown, empty or
/// unterminated placeholder, or a stray `}`.
pub fn render_policy_template(template: &str, vars: &[(&str, &str)]) -> VaultResult<String> {
    let mut rendered = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                rendered.push('{');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(c) => name.push(c),
                        None => {
                            return Err(VaultError::PolicyTemplate(format!(
                                "unterminated placeholder `{{{name}`"
                            )));
                        }
                    }
                }
                let value = vars
                    .iter()
                    .find(|(key, _)| *key == name)
                    .map(|(_, value)| *value)
                    .ok_or_else(|| {
                        VaultError::PolicyTemplate(format!("unknown placeholder `{{{name}}}`"))
                    })?;
                rendered.push_str(value);
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                rendered.push('}');
            }
            '}' => {
                return Err(VaultError::PolicyTemplate(
                    "single `}` encountered; use `}}` for a literal brace".to_string(),
                ));
            }
            c => rendered.push(c),
        }
    }

    Ok(rendered)
}

impl Vault {
    /// Create or update a policy from a file.
    ///
    /// With no `vars` the file is uploaded verbatim; otherwise it is rendered
    /// with [`render_policy_template`] first.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or rendered, or if Vault
    /// rejects the policy.
    #[instrument(
        target = "vault_client",
        skip(self, policy_path, vars),
        fields(path = %policy_path.as_ref().display())
    )]
    pub async fn configure_policy(
        &self,
        name: &str,
        policy_path: impl AsRef<Path>,
        vars: &[(&str, &str)],
    ) -> VaultResult<()> {
        let policy_path = policy_path.as_ref();
        let source = tokio::fs::read_to_string(policy_path)
            .await
            .map_err(|source| VaultError::PolicySource {
                path: policy_path.to_path_buf(),
                source,
            })?;
        let policy = if vars.is_empty() {
            source
        } else {
            render_policy_template(&source, vars)?
        };

        let body = serde_json::json!({ "policy": policy });
        let path = format!("sys/policy/{name}");
        self.write(Method::PUT, &path, Some(&body)).await?;
        debug!(target: LOG_TARGET, "Created or updated policy: {name}");
        Ok(())
    }

    /// Delete a policy.
    ///
    /// # Errors
    ///
    /// Returns any rejection of the request.
    pub async fn delete_policy(&self, name: &str) -> VaultResult<()> {
        let path = format!("sys/policy/{name}");
        self.write(Method::DELETE, &path, None).await?;
        info!(target: LOG_TARGET, "Deleted policy {name}");
        Ok(())
    }

    /// Create or update an `AppRole` role and return its role id.
    ///
    /// # Errors
    ///
    /// Returns any rejection of the role write or the role id read.
    #[instrument(target = "vault_client", skip(self))]
    pub async fn configure_approle(
        &self,
        name: &str,
        options: &AppRoleOptions,
    ) -> VaultResult<String> {
        let path = format!("auth/approle/role/{name}");
        let body = options.to_body();
        self.write(Method::POST, &path, Some(&body)).await?;
        let role: RoleIdData = self.read_data(&format!("{path}/role-id")).await?;
        Ok(role.role_id)
    }

    /// Delete an `AppRole` role.
    ///
    /// # Errors
    ///
    /// Returns any rejection of the request.
    pub async fn delete_approle(&self, name: &str) -> VaultResult<()> {
        let path = format!("auth/approle/role/{name}");
        self.write(Method::DELETE, &path, None).await?;
        info!(target: LOG_TARGET, "Deleted approle {name}");
        Ok(())
    }

    /// Issue a new secret id for a role, optionally bound to networks.
    ///
    /// # Errors
    ///
    /// Returns any rejection of the request.
    pub async fn generate_role_secret_id(
        &self,
        name: &str,
        cidrs: &[String],
    ) -> VaultResult<SecretString> {
        let body = if cidrs.is_empty() {
            serde_json::json!({})
        } else {
            serde_json::json!({ "cidr_list": cidrs })
        };
        let data: SecretIdData = self
            .write_data(
                Method::POST,
                &format!("auth/approle/role/{name}/secret-id"),
                &body,
            )
            .await?;
        Ok(SecretString::from(data.secret_id))
    }

    /// Look up the definition of a secret id issued for a role.
    ///
    /// # Errors
    ///
    /// Returns any rejection of the request, or
    /// [`VaultError::UnexpectedResponse`] if Vault knows no such secret id.
    pub async fn read_role_secret(
        &self,
        name: &str,
        secret_id: &str,
    ) -> VaultResult<SecretIdInfo> {
        let body = serde_json::json!({ "secret_id": secret_id });
        self.write_data(
            Method::POST,
            &format!("auth/approle/role/{name}/secret-id/lookup"),
            &body,
        )
        .await
    }
}
