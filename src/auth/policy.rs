//! Server-wide admission policy.

use thiserror::Error;

use crate::auth::secret::{Secret, SecretError};
use crate::config::AuthConfig;
use crate::protocol::ConnectRequest;

/// Error raised when the configured auth fields do not describe one policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("auth.token cannot be combined with auth.username/auth.password")]
    Conflicting,

    #[error("auth.{present} is set but auth.{missing} is empty")]
    Incomplete {
        present: &'static str,
        missing: &'static str,
    },

    #[error("auth.{field} is not a valid hash: {source}")]
    MalformedSecret {
        field: &'static str,
        #[source]
        source: SecretError,
    },
}

/// Which kind of credential a policy expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionMode {
    None,
    Token,
    UserPass,
}

impl AdmissionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            AdmissionMode::None => "none",
            AdmissionMode::Token => "token",
            AdmissionMode::UserPass => "user_pass",
        }
    }
}

/// Outcome of checking a CONNECT against the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Rejected,
}

/// Admission policy, built once at startup and shared read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionPolicy {
    /// No credentials required.
    None,
    /// A single shared token.
    Token(Secret),
    /// A single username/password pair.
    UserPass { username: String, password: Secret },
}

impl AdmissionPolicy {
    /// Select the policy from whichever auth fields are populated.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] when the fields conflict, a pair is
    /// half-populated, or a hashed secret is malformed.
    pub fn from_config(config: &AuthConfig) -> Result<Self, PolicyError> {
        let has_token = !config.token.is_empty();
        let has_user = !config.username.is_empty();
        let has_pass = !config.password.is_empty();

        match (has_token, has_user, has_pass) {
            (false, false, false) => Ok(AdmissionPolicy::None),
            (true, false, false) => {
                let token = parse_secret("token", &config.token)?;
                Ok(AdmissionPolicy::Token(token))
            }
            (false, true, true) => {
                let password = parse_secret("password", &config.password)?;
                Ok(AdmissionPolicy::UserPass {
                    username: config.username.clone(),
                    password,
                })
            }
            (true, _, _) => Err(PolicyError::Conflicting),
            (false, true, false) => Err(PolicyError::Incomplete {
                present: "username",
                missing: "password",
            }),
            (false, false, true) => Err(PolicyError::Incomplete {
                present: "password",
                missing: "username",
            }),
        }
    }

    pub fn mode(&self) -> AdmissionMode {
        match self {
            AdmissionPolicy::None => AdmissionMode::None,
            AdmissionPolicy::Token(_) => AdmissionMode::Token,
            AdmissionPolicy::UserPass { .. } => AdmissionMode::UserPass,
        }
    }

    /// Value advertised as `auth_required` in the INFO banner.
    pub fn auth_required(&self) -> bool {
        self.mode() != AdmissionMode::None
    }

    /// Check the credentials carried by a CONNECT.
    ///
    /// A wrong username returns before the password is looked at; only the
    /// secret comparison is timing-safe.
    pub fn verify(&self, request: &ConnectRequest) -> Verdict {
        let accepted = match self {
            AdmissionPolicy::None => true,
            AdmissionPolicy::Token(token) => {
                !request.auth_token.is_empty() && token.verify(&request.auth_token)
            }
            AdmissionPolicy::UserPass { username, password } => {
                request.user == *username
                    && !request.pass.is_empty()
                    && password.verify(&request.pass)
            }
        };

        if accepted {
            Verdict::Accepted
        } else {
            Verdict::Rejected
        }
    }
}

fn parse_secret(field: &'static str, raw: &str) -> Result<Secret, PolicyError> {
    Secret::parse(raw).map_err(|source| PolicyError::MalformedSecret { field, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: &str = "_YZZ22_";
    const BCRYPT_TOKEN: &str = "0uhJOSr3GW7xvHvtd^K6pa";
    const BCRYPT_TOKEN_HASH: &str = "$2a$04$u5ZClXpcjHgpfc61Ee0VKuwI1K3vTC4zq7SjphjnlHMeb1Llkb5Y6";
    const BCRYPT_PASS: &str = "IW@$6v(y1(t@fhPDvf!5^%";
    const BCRYPT_PASS_HASH: &str = "$2a$04$Q.CgCP2Sl9pkcTXEZHazaeMwPaAkSHk7AI51HkyMt5iJQQyUA4qxq";

    fn auth(token: &str, username: &str, password: &str) -> AuthConfig {
        AuthConfig {
            token: token.to_string(),
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    fn connect(token: &str, user: &str, pass: &str) -> ConnectRequest {
        ConnectRequest {
            auth_token: token.to_string(),
            user: user.to_string(),
            pass: pass.to_string(),
            ..ConnectRequest::default()
        }
    }

    #[test]
    fn mode_follows_populated_fields() {
        assert_eq!(
            AdmissionPolicy::from_config(&auth("", "", "")).unwrap().mode(),
            AdmissionMode::None
        );
        assert_eq!(
            AdmissionPolicy::from_config(&auth(TOKEN, "", "")).unwrap().mode(),
            AdmissionMode::Token
        );
        assert_eq!(
            AdmissionPolicy::from_config(&auth("", "derek", "foobar"))
                .unwrap()
                .mode(),
            AdmissionMode::UserPass
        );
    }

    #[test]
    fn auth_required_matches_mode() {
        assert!(!AdmissionPolicy::None.auth_required());
        assert!(AdmissionPolicy::from_config(&auth(TOKEN, "", ""))
            .unwrap()
            .auth_required());
        assert!(AdmissionPolicy::from_config(&auth("", "derek", "foobar"))
            .unwrap()
            .auth_required());
    }

    #[test]
    fn invalid_combinations_fail_fast() {
        assert_eq!(
            AdmissionPolicy::from_config(&auth(TOKEN, "derek", "foobar")),
            Err(PolicyError::Conflicting)
        );
        assert_eq!(
            AdmissionPolicy::from_config(&auth("", "derek", "")),
            Err(PolicyError::Incomplete {
                present: "username",
                missing: "password"
            })
        );
        assert!(matches!(
            AdmissionPolicy::from_config(&auth("$2a$04$broken", "", "")),
            Err(PolicyError::MalformedSecret { field: "token", .. })
        ));
    }

    #[test]
    fn disabled_policy_accepts_anything() {
        let policy = AdmissionPolicy::None;
        assert_eq!(policy.verify(&ConnectRequest::default()), Verdict::Accepted);
        assert_eq!(policy.verify(&connect("junk", "x", "y")), Verdict::Accepted);
    }

    #[test]
    fn plaintext_token() {
        let policy = AdmissionPolicy::from_config(&auth(TOKEN, "", "")).unwrap();
        assert_eq!(policy.verify(&connect(TOKEN, "", "")), Verdict::Accepted);
        assert_eq!(policy.verify(&connect("", "", "")), Verdict::Rejected);
        assert_eq!(policy.verify(&connect("ZZZ", "", "")), Verdict::Rejected);
    }

    #[test]
    fn hashed_token() {
        let policy = AdmissionPolicy::from_config(&auth(BCRYPT_TOKEN_HASH, "", "")).unwrap();
        assert_eq!(policy.verify(&connect(BCRYPT_TOKEN, "", "")), Verdict::Accepted);
        assert_eq!(
            policy.verify(&connect(BCRYPT_TOKEN_HASH, "", "")),
            Verdict::Rejected
        );
    }

    #[test]
    fn plaintext_user_pass() {
        let policy = AdmissionPolicy::from_config(&auth("", "derek", "foobar")).unwrap();
        assert_eq!(policy.verify(&connect("", "derek", "foobar")), Verdict::Accepted);
        assert_eq!(policy.verify(&connect("", "derekzz", "foobar")), Verdict::Rejected);
        assert_eq!(policy.verify(&connect("", "Derek", "foobar")), Verdict::Rejected);
        assert_eq!(policy.verify(&connect("", "derek", "ZZ")), Verdict::Rejected);
        assert_eq!(policy.verify(&connect("", "", "")), Verdict::Rejected);
    }

    #[test]
    fn hashed_user_pass() {
        let policy =
            AdmissionPolicy::from_config(&auth("", "derek", BCRYPT_PASS_HASH)).unwrap();
        assert_eq!(
            policy.verify(&connect("", "derek", BCRYPT_PASS)),
            Verdict::Accepted
        );
        assert_eq!(
            policy.verify(&connect("", "derek", BCRYPT_PASS_HASH)),
            Verdict::Rejected
        );
    }
}
