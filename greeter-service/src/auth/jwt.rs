//! JWT bearer token validation

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::{fs, sync::Arc};

use super::token::{Claims, TokenValidator};
use crate::{config::JwtConfig, error::Error};

/// JWT validator with fixed issuer, audience and key material
#[derive(Clone)]
pub struct JwtValidator {
    decoding_key: Arc<DecodingKey>,
    validation: Validation,
}

impl std::fmt::Debug for JwtValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtValidator")
            .field("algorithms", &self.validation.algorithms)
            .field("iss", &self.validation.iss)
            .field("aud", &self.validation.aud)
            .finish_non_exhaustive()
    }
}

impl JwtValidator {
    /// Create a validator from configuration, reading the key file
    pub fn new(config: &JwtConfig) -> Result<Self, Error> {
        let key_material = fs::read(&config.public_key_path).map_err(|e| {
            let path_display = config.public_key_path.display().to_string();
            Error::config(format!(
                "Failed to read JWT key from path '{}'\n\n\
                Troubleshooting:\n\
                1. Verify the file exists: ls -la {}\n\
                2. Check file permissions (must be readable)\n\
                3. For RS256/ES256: Use PEM format public key\n\
                4. For HS256: Use raw secret file\n\n\
                Error: {}",
                path_display, path_display, e
            ))
        })?;

        Self::from_key_material(config, &key_material)
    }

    /// Create a validator from in-memory key material
    ///
    /// `config.public_key_path` is ignored.
    pub fn from_key_material(config: &JwtConfig, key_material: &[u8]) -> Result<Self, Error> {
        if config.issuer.trim().is_empty() {
            return Err(Error::config("jwt.issuer must be set"));
        }
        if config.audience.trim().is_empty() {
            return Err(Error::config("jwt.audience must be set"));
        }

        let algorithm = parse_algorithm(&config.algorithm)?;

        let decoding_key = match algorithm {
            Algorithm::RS256 | Algorithm::RS384 | Algorithm::RS512 => {
                DecodingKey::from_rsa_pem(key_material)?
            }
            Algorithm::ES256 | Algorithm::ES384 => DecodingKey::from_ec_pem(key_material)?,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => {
                DecodingKey::from_secret(key_material)
            }
            _ => {
                return Err(Error::config(format!(
                    "Unsupported algorithm: {:?}",
                    algorithm
                )))
            }
        };

        let mut validation = Validation::new(algorithm);
        validation.set_issuer(&[&config.issuer]);
        validation.set_audience(&[&config.audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);
        validation.validate_exp = true;
        validation.leeway = config.leeway_secs;

        Ok(Self {
            decoding_key: Arc::new(decoding_key),
            validation,
        })
    }
}

fn parse_algorithm(name: &str) -> Result<Algorithm, Error> {
    match name.to_uppercase().as_str() {
        "RS256" => Ok(Algorithm::RS256),
        "RS384" => Ok(Algorithm::RS384),
        "RS512" => Ok(Algorithm::RS512),
        "ES256" => Ok(Algorithm::ES256),
        "ES384" => Ok(Algorithm::ES384),
        "HS256" => Ok(Algorithm::HS256),
        "HS384" => Ok(Algorithm::HS384),
        "HS512" => Ok(Algorithm::HS512),
        alg => Err(Error::config(format!("Unsupported JWT algorithm: {}", alg))),
    }
}

impl TokenValidator for JwtValidator {
    fn validate_token(&self, token: &str) -> Result<Claims, Error> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(token_data.claims)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_valid_token_yields_claims() {
        let claims = validator().validate_token(&valid_token(Some("alice"))).unwrap();
        assert_eq!(claims.name.as_deref(), Some("alice"));
        assert_eq!(claims.sub.as_deref(), Some("user:42"));
        assert_eq!(claims.iss.as_deref(), Some(ISSUER));
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = sign(
            json!({ "iss": ISSUER, "aud": AUDIENCE, "exp": now() - 600 }),
            SECRET,
        );
        assert!(matches!(validator().validate_token(&token), Err(Error::Jwt(_))));
    }

    #[test]
    fn test_wrong_issuer_rejected() {
        let token = sign(
            json!({ "iss": "https://evil.test", "aud": AUDIENCE, "exp": now() + 600 }),
            SECRET,
        );
        assert!(validator().validate_token(&token).is_err());
    }

    #[test]
    fn test_wrong_audience_rejected() {
        let token = sign(
            json!({ "iss": ISSUER, "aud": "someone-else", "exp": now() + 600 }),
            SECRET,
        );
        assert!(validator().validate_token(&token).is_err());
    }

    #[test]
    fn test_missing_audience_rejected() {
        let token = sign(json!({ "iss": ISSUER, "exp": now() + 600 }), SECRET);
        assert!(validator().validate_token(&token).is_err());
    }

    #[test]
    fn test_bad_signature_rejected() {
        let token = sign(
            json!({ "iss": ISSUER, "aud": AUDIENCE, "exp": now() + 600 }),
            b"a-completely-different-secret-value",
        );
        assert!(validator().validate_token(&token).is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(validator().validate_token("not.a.jwt").is_err());
        assert!(validator().validate_token("").is_err());
    }

    #[test]
    fn test_unsupported_algorithm_rejected() {
        let mut config = jwt_config();
        config.algorithm = "none".to_string();
        assert!(matches!(
            JwtValidator::from_key_material(&config, SECRET),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_issuer_and_audience_are_required() {
        let mut config = jwt_config();
        config.issuer = String::new();
        assert!(JwtValidator::from_key_material(&config, SECRET).is_err());

        let mut config = jwt_config();
        config.audience = " ".to_string();
        assert!(JwtValidator::from_key_material(&config, SECRET).is_err());
    }

    #[test]
    fn test_new_reads_key_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SECRET).unwrap();

        let mut config = jwt_config();
        config.public_key_path = file.path().to_path_buf();
        let validator = JwtValidator::new(&config).unwrap();
        assert!(validator.validate_token(&valid_token(None)).is_ok());
    }

    #[test]
    fn test_new_reports_missing_key_file() {
        let mut config = jwt_config();
        config.public_key_path = "/nonexistent/greeter/jwt.key".into();
        let err = JwtValidator::new(&config).unwrap_err();
        assert!(err.to_string().contains("Failed to read JWT key"));
    }
}
