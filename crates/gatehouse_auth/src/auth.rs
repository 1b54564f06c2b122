use crate::schema::{
    AccessClaims, BaseClaims, RefreshClaims, ACCESS_TOKEN_TYPE, REFRESH_TOKEN_TYPE,
};
use chrono::DateTime;
use gatehouse_error::error::AuthError;
use gatehouse_settings::config::GatehouseConfig;
use gatehouse_sql::base::SqlClient;
use gatehouse_sql::enums::client::SqlClientEnum;
use gatehouse_sql::schemas::schema::User;
use gatehouse_types::TokenPair;
use gatehouse_utils::utils::get_utc_timestamp;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use password_auth::{generate_hash, verify_password};
use serde::de::DeserializeOwned;
use tracing::debug;
use uuid::Uuid;

/// Issues and checks HS256 session tokens
#[derive(Clone)]
pub struct AuthManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: i64,
    refresh_ttl: i64,
}

impl AuthManager {
    pub fn new(jwt_secret: &str, access_ttl: i64, refresh_ttl: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn from_config(config: &GatehouseConfig) -> Self {
        Self::new(
            &config.jwt_secret,
            config.access_token_ttl,
            config.refresh_token_ttl,
        )
    }

    fn encode_claims<T: serde::Serialize>(&self, claims: &T) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenError(e.to_string()))
    }

    fn decode_claims<T: DeserializeOwned>(&self, token: &str) -> Result<T, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        decode::<T>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!("Token rejected: {}", e);
                AuthError::InvalidToken(e.to_string())
            })
    }

    pub fn generate_access_token(&self, user: &User) -> Result<String, AuthError> {
        let now = get_utc_timestamp();
        let claims = AccessClaims {
            token_type: ACCESS_TOKEN_TYPE.to_string(),
            user_id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            name: user.display_name(),
            is_admin: user.is_staff,
            iat: now,
            exp: now + self.access_ttl,
            jti: Uuid::new_v4().to_string(),
        };

        self.encode_claims(&claims)
    }

    pub fn generate_refresh_token(&self, user: &User) -> Result<String, AuthError> {
        let now = get_utc_timestamp();
        let claims = RefreshClaims {
            token_type: REFRESH_TOKEN_TYPE.to_string(),
            user_id: user.id,
            iat: now,
            exp: now + self.refresh_ttl,
            jti: Uuid::new_v4().to_string(),
        };

        self.encode_claims(&claims)
    }

    /// Fresh access/refresh pair for a user
    pub fn issue(&self, user: &User) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            refresh: self.generate_refresh_token(user)?,
            access: self.generate_access_token(user)?,
        })
    }

    pub fn validate_access_token(&self, token: &str) -> Result<AccessClaims, AuthError> {
        let claims: AccessClaims = self.decode_claims(token)?;
        if claims.token_type != ACCESS_TOKEN_TYPE {
            return Err(AuthError::InvalidToken("Token has wrong type".to_string()));
        }
        Ok(claims)
    }

    pub fn validate_refresh_token(&self, token: &str) -> Result<RefreshClaims, AuthError> {
        let claims: RefreshClaims = self.decode_claims(token)?;
        if claims.token_type != REFRESH_TOKEN_TYPE {
            return Err(AuthError::InvalidToken("Token has wrong type".to_string()));
        }
        Ok(claims)
    }

    /// Signature and expiry check for either token type
    pub fn validate_token(&self, token: &str) -> Result<BaseClaims, AuthError> {
        self.decode_claims(token)
    }

    pub fn validate_user(&self, user: &User, password: &str) -> Result<(), AuthError> {
        if !user.is_active {
            return Err(AuthError::InvalidCredentials);
        }
        verify_password(password, &user.password_hash).map_err(|_| AuthError::InvalidCredentials)
    }

    /// Look up an account by username and check its password. Unknown users, wrong
    /// passwords and inactive accounts all fail the same way.
    pub async fn authenticate(
        &self,
        sql_client: &SqlClientEnum,
        username: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let user = sql_client
            .get_user_by_username(username)
            .await
            .map_err(|e| AuthError::StoreError(e.to_string()))?
            .ok_or(AuthError::InvalidCredentials)?;

        self.validate_user(&user, password)?;
        Ok(user)
    }

    /// Exchange a refresh token for a new access token
    pub async fn refresh_access_token(
        &self,
        sql_client: &SqlClientEnum,
        refresh_token: &str,
    ) -> Result<String, AuthError> {
        let claims = self.validate_refresh_token(refresh_token)?;

        let revoked = sql_client
            .is_token_revoked(&claims.jti)
            .await
            .map_err(|e| AuthError::StoreError(e.to_string()))?;
        if revoked {
            return Err(AuthError::InvalidToken("Token is blacklisted".to_string()));
        }

        let user = sql_client
            .get_user(claims.user_id)
            .await
            .map_err(|e| AuthError::StoreError(e.to_string()))?
            .filter(|user| user.is_active)
            .ok_or_else(|| AuthError::InvalidToken("User not found".to_string()))?;

        self.generate_access_token(&user)
    }

    /// Revoke a refresh token owned by `user_id`
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - the token was recorded as revoked
    /// * `Ok(false)` - the token is invalid or belongs to another account, nothing written
    pub async fn revoke_refresh_token(
        &self,
        sql_client: &SqlClientEnum,
        refresh_token: &str,
        user_id: i64,
    ) -> Result<bool, AuthError> {
        let claims = match self.validate_refresh_token(refresh_token) {
            Ok(claims) if claims.user_id == user_id => claims,
            _ => return Ok(false),
        };

        let expires_at = DateTime::from_timestamp(claims.exp, 0)
            .map(|dt| dt.naive_utc())
            .ok_or_else(|| AuthError::InvalidToken("Invalid expiry".to_string()))?;

        sql_client
            .revoke_token(&claims.jti, user_id, expires_at)
            .await
            .map_err(|e| AuthError::StoreError(e.to_string()))?;

        Ok(true)
    }
}

pub fn hash_password(password: &str) -> String {
    generate_hash(password)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatehouse_settings::config::{DatabaseSettings, SqlType};
    use gatehouse_sql::schemas::schema::NewUser;
    use gatehouse_utils::utils::get_utc_datetime;

    fn user() -> User {
        User {
            id: 7,
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            password_hash: hash_password("s3cret"),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            image: None,
            is_active: true,
            is_staff: true,
            is_superuser: false,
            date_joined: get_utc_datetime(),
            last_login: None,
        }
    }

    async fn sql_client() -> SqlClientEnum {
        let settings = DatabaseSettings {
            connection_uri: "sqlite::memory:".to_string(),
            max_connections: 1,
            sql_type: SqlType::Sqlite,
        };
        SqlClientEnum::new(&settings).await.unwrap()
    }

    async fn stored_user(client: &SqlClientEnum) -> User {
        client
            .insert_user(
                &NewUser::new(
                    "ada".to_string(),
                    "ada@example.com".to_string(),
                    hash_password("s3cret"),
                    "Ada".to_string(),
                    "Lovelace".to_string(),
                ),
                None,
            )
            .await
            .unwrap()
    }

    #[test]
    fn test_access_token_claims() {
        let manager = AuthManager::new("secret", 300, 86400);
        let token = manager.generate_access_token(&user()).unwrap();

        let claims = manager.validate_access_token(&token).unwrap();
        assert_eq!(claims.user_id, 7);
        assert_eq!(claims.username, "ada");
        assert_eq!(claims.name, "Ada Lovelace");
        assert!(claims.is_admin);
        assert_eq!(claims.exp - claims.iat, 300);
    }

    #[test]
    fn test_token_types_are_not_interchangeable() {
        let manager = AuthManager::new("secret", 300, 86400);
        let pair = manager.issue(&user()).unwrap();

        assert!(manager.validate_access_token(&pair.refresh).is_err());
        assert!(manager.validate_refresh_token(&pair.access).is_err());

        assert_eq!(manager.validate_token(&pair.refresh).unwrap().token_type, "refresh");
        assert_eq!(manager.validate_token(&pair.access).unwrap().token_type, "access");
    }

    #[test]
    fn test_tampered_and_foreign_tokens() {
        let manager = AuthManager::new("secret", 300, 86400);
        let other = AuthManager::new("other-secret", 300, 86400);
        let token = other.generate_access_token(&user()).unwrap();

        assert!(matches!(
            manager.validate_access_token(&token),
            Err(AuthError::InvalidToken(_))
        ));
        assert!(manager.validate_token("not-a-token").is_err());
    }

    #[test]
    fn test_expired_token() {
        let manager = AuthManager::new("secret", -60, -60);
        let pair = manager.issue(&user()).unwrap();

        assert!(manager.validate_access_token(&pair.access).is_err());
        assert!(manager.validate_refresh_token(&pair.refresh).is_err());
    }

    #[test]
    fn test_validate_user() {
        let manager = AuthManager::new("secret", 300, 86400);
        let mut user = user();

        assert!(manager.validate_user(&user, "s3cret").is_ok());
        assert_eq!(
            manager.validate_user(&user, "wrong"),
            Err(AuthError::InvalidCredentials)
        );

        user.is_active = false;
        assert_eq!(
            manager.validate_user(&user, "s3cret"),
            Err(AuthError::InvalidCredentials)
        );
    }

    #[tokio::test]
    async fn test_authenticate() {
        let client = sql_client().await;
        let manager = AuthManager::new("secret", 300, 86400);
        stored_user(&client).await;

        let user = manager.authenticate(&client, "ada", "s3cret").await.unwrap();
        assert_eq!(user.username, "ada");

        let missing = manager.authenticate(&client, "ghost", "s3cret").await;
        assert_eq!(missing.unwrap_err(), AuthError::InvalidCredentials);
    }

    #[tokio::test]
    async fn test_refresh_and_revoke() {
        let client = sql_client().await;
        let manager = AuthManager::new("secret", 300, 86400);
        let user = stored_user(&client).await;
        let pair = manager.issue(&user).unwrap();

        let access = manager
            .refresh_access_token(&client, &pair.refresh)
            .await
            .unwrap();
        assert_eq!(manager.validate_access_token(&access).unwrap().user_id, user.id);

        // someone else's token is left alone
        assert!(!manager
            .revoke_refresh_token(&client, &pair.refresh, user.id + 1)
            .await
            .unwrap());

        assert!(manager
            .revoke_refresh_token(&client, &pair.refresh, user.id)
            .await
            .unwrap());
        assert!(manager
            .refresh_access_token(&client, &pair.refresh)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_refresh_rejects_inactive_user() {
        let client = sql_client().await;
        let manager = AuthManager::new("secret", 300, 86400);
        let mut user = stored_user(&client).await;
        let pair = manager.issue(&user).unwrap();

        user.is_active = false;
        client.update_user(&user, None).await.unwrap();

        assert!(manager
            .refresh_access_token(&client, &pair.refresh)
            .await
            .is_err());
    }
}
