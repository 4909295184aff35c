//! token サブコマンド
//!
//! 開発・動作確認用のBearerトークンを発行します。
//! 署名鍵・audience・issuer はサーバーと同じ環境変数から読み込みます。

use crate::auth::jwt::create_jwt;
use crate::config::AuthConfig;
use clap::Args;

/// token サブコマンドの引数
#[derive(Args, Debug, Clone)]
pub struct TokenArgs {
    /// Employee email (stored in the `unique_name` claim)
    #[arg(short, long)]
    pub email: String,

    /// Display name (stored in the `name` claim)
    #[arg(short, long)]
    pub name: Option<String>,
}

/// トークンを発行して標準出力に書き出す
pub fn execute(args: &TokenArgs) -> anyhow::Result<()> {
    if std::env::var("AUDIT_JWT_SECRET").is_err() && std::env::var("JWT_SECRET").is_err() {
        anyhow::bail!("AUDIT_JWT_SECRET must be set to issue a token the server will accept");
    }
    let config = AuthConfig::from_env();
    let token = create_jwt(args.email.trim(), args.name.as_deref(), &config)?;
    println!("{}", token);
    Ok(())
}
