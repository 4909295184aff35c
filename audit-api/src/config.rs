//! Configuration management via environment variables
//!
//! Provides helper functions for reading environment variables with fallback
//! to legacy variable names with warning logs, plus the typed settings the
//! server reads once at startup.

/// Get an environment variable with fallback to a legacy name
///
/// If the new variable name is set, returns its value.
/// If only the legacy variable name is set, returns its value
/// and logs a deprecation warning.
///
/// # Arguments
/// * `new_name` - The new environment variable name (preferred)
/// * `old_name` - The legacy environment variable name (fallback)
///
/// # Returns
/// * `Some(value)` - The environment variable value
/// * `None` - Neither variable is set
///
/// # Example
/// ```
/// use audit_api::config::get_env_with_fallback;
///
/// let port = get_env_with_fallback("AUDIT_PORT", "PORT");
/// ```
pub fn get_env_with_fallback(new_name: &str, old_name: &str) -> Option<String> {
    if let Ok(val) = std::env::var(new_name) {
        return Some(val);
    }
    if new_name == old_name {
        return None;
    }
    if let Ok(val) = std::env::var(old_name) {
        tracing::warn!(
            "Environment variable '{}' is deprecated, use '{}' instead",
            old_name,
            new_name
        );
        return Some(val);
    }
    None
}

/// Get an environment variable with fallback and default value
///
/// # Returns
/// The environment variable value or the default
pub fn get_env_with_fallback_or(new_name: &str, old_name: &str, default: &str) -> String {
    get_env_with_fallback(new_name, old_name).unwrap_or_else(|| default.to_string())
}

/// Get an environment variable with fallback, parsing to a specific type
///
/// # Arguments
/// * `new_name` - The new environment variable name (preferred)
/// * `old_name` - The legacy environment variable name (fallback)
/// * `default` - The default value to return if neither is set or parsing fails
pub fn get_env_with_fallback_parse<T: std::str::FromStr>(
    new_name: &str,
    old_name: &str,
    default: T,
) -> T {
    get_env_with_fallback(new_name, old_name)
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// 認証無効化モードの有効/無効を取得
///
/// 環境変数 `AUDIT_AUTH_DISABLED`（旧: `AUTH_DISABLED`）が `true/1/yes/on` のときに有効化する。
pub fn is_auth_disabled() -> bool {
    get_env_with_fallback("AUDIT_AUTH_DISABLED", "AUTH_DISABLED")
        .map(|value| is_truthy(&value))
        .unwrap_or(false)
}

/// データベースURLを取得
///
/// 未設定の場合は `sqlite:~/.audit-api/audit.db` を使う。
pub fn database_url() -> String {
    if let Some(url) = get_env_with_fallback("AUDIT_DATABASE_URL", "DATABASE_URL") {
        return url;
    }
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    format!("sqlite:{}/.audit-api/audit.db", home)
}

/// サーバーの待ち受け設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// バインドアドレス
    pub host: String,
    /// ポート
    pub port: u16,
}

impl ServerConfig {
    /// 環境変数から読み込む
    pub fn from_env() -> Self {
        let host = get_env_with_fallback_or("AUDIT_HOST", "AUDIT_HOST", "0.0.0.0");
        let port = get_env_with_fallback_parse("AUDIT_PORT", "PORT", 8000);
        Self { host, port }
    }

    /// コマンドライン引数から作成
    pub fn from_args(host: String, port: u16) -> Self {
        Self { host, port }
    }

    /// `host:port` 形式のバインドアドレス
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// JWT検証設定
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HS256署名鍵
    pub jwt_secret: String,
    /// 期待する `aud`（未設定なら検査しない）
    pub audience: Option<String>,
    /// 期待する `iss`（未設定なら検査しない）
    pub issuer: Option<String>,
    /// 認証無効化モード
    pub disabled: bool,
}

impl AuthConfig {
    /// 環境変数から読み込む
    ///
    /// 署名鍵が未設定の場合はプロセスごとのランダムな鍵を生成する。
    /// この場合、再起動すると発行済みトークンは検証できなくなる。
    pub fn from_env() -> Self {
        let jwt_secret = match get_env_with_fallback("AUDIT_JWT_SECRET", "JWT_SECRET") {
            Some(secret) if !secret.is_empty() => secret,
            _ => {
                tracing::warn!(
                    "AUDIT_JWT_SECRET is not set; using a random per-process secret"
                );
                format!("{}{}", uuid::Uuid::new_v4().simple(), uuid::Uuid::new_v4().simple())
            }
        };
        let non_empty = |value: String| {
            let trimmed = value.trim().to_string();
            (!trimmed.is_empty()).then_some(trimmed)
        };

        Self {
            jwt_secret,
            audience: get_env_with_fallback("AUDIT_JWT_AUDIENCE", "VALID_AUDIENCE")
                .and_then(non_empty),
            issuer: get_env_with_fallback("AUDIT_JWT_ISSUER", "VALID_ISSUER").and_then(non_empty),
            disabled: is_auth_disabled(),
        }
    }
}
