use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub username: String,
    pub password: String,
    pub from: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LastfmConfig {
    pub api_key: String,
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KhaltiConfig {
    pub secret_key: String,
    pub base_url: String,
    pub website_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub smtp: SmtpConfig,
    pub lastfm: LastfmConfig,
    pub khalti: KhaltiConfig,
    pub google: GoogleConfig,
    pub otp_ttl_minutes: i64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "discnote".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "discnote-users".into()),
            // Six-day session window unless overridden.
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 6),
        };
        let smtp = SmtpConfig {
            host: std::env::var("SMTP_HOST").unwrap_or_else(|_| "smtp.gmail.com".into()),
            username: std::env::var("SMTP_USERNAME")?,
            password: std::env::var("SMTP_PASSWORD")?,
            from: std::env::var("SMTP_FROM").or_else(|_| std::env::var("SMTP_USERNAME"))?,
        };
        let lastfm = LastfmConfig {
            api_key: std::env::var("LASTFM_API_KEY")?,
            base_url: std::env::var("LASTFM_BASE_URL")
                .unwrap_or_else(|_| "http://ws.audioscrobbler.com/2.0".into()),
        };
        let khalti = KhaltiConfig {
            secret_key: std::env::var("KHALTI_SECRET_KEY")?,
            base_url: std::env::var("KHALTI_BASE_URL")
                .unwrap_or_else(|_| "https://a.khalti.com/api/v2".into()),
            website_url: std::env::var("KHALTI_WEBSITE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),
        };
        let google = GoogleConfig {
            client_id: std::env::var("GOOGLE_CLIENT_ID")?,
            client_secret: std::env::var("GOOGLE_CLIENT_SECRET")?,
            redirect_url: std::env::var("GOOGLE_REDIRECT_URL")
                .unwrap_or_else(|_| "http://localhost:8080/auth/google/callback".into()),
        };
        let otp_ttl_minutes = std::env::var("OTP_TTL_MINUTES")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(5);

        Ok(Self {
            database_url,
            jwt,
            smtp,
            lastfm,
            khalti,
            google,
            otp_ttl_minutes,
        })
    }
}
