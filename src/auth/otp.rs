use std::sync::Arc;

use axum::extract::FromRef;
use rand::Rng;
use time::{Duration, OffsetDateTime};
use tracing::{debug, warn};

use crate::auth::pending::{PendingRegistration, PendingStore};
use crate::auth::repo_types::User;
use crate::clock::Clock;
use crate::email::Mailer;
use crate::error::ApiError;
use crate::state::AppState;

/// State of a one-time code relative to the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeState {
    Live,
    Expired,
}

/// The boundary instant is accepted; a code dies strictly after its expiry.
pub fn code_state(expires_at: OffsetDateTime, now: OffsetDateTime) -> CodeState {
    if now > expires_at {
        CodeState::Expired
    } else {
        CodeState::Live
    }
}

/// Six digits, uniform over [100000, 999999].
pub fn generate_code() -> String {
    rand::thread_rng().gen_range(100_000..=999_999).to_string()
}

/// Gates account activation and password replacement behind a short-lived,
/// single-use emailed code. All time reads go through the injected clock.
pub struct OtpManager {
    pending: Arc<dyn PendingStore>,
    mailer: Arc<dyn Mailer>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl FromRef<AppState> for OtpManager {
    fn from_ref(state: &AppState) -> Self {
        Self::new(
            state.pending.clone(),
            state.mailer.clone(),
            state.clock.clone(),
            Duration::minutes(state.config.otp_ttl_minutes),
        )
    }
}

impl OtpManager {
    pub fn new(
        pending: Arc<dyn PendingStore>,
        mailer: Arc<dyn Mailer>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
    ) -> Self {
        Self {
            pending,
            mailer,
            clock,
            ttl,
        }
    }

    pub fn fresh_code(&self) -> (String, OffsetDateTime) {
        (generate_code(), self.clock.now() + self.ttl)
    }

    fn code_body(&self, code: &str, resend: bool) -> String {
        let prefix = if resend { "Your new OTP is" } else { "Your OTP is" };
        format!(
            "{} {}. It expires in {} minutes.",
            prefix,
            code,
            self.ttl.whole_minutes()
        )
    }

    /// Store a pending registration (replacing any prior entry for the email)
    /// and send its code. The entry is written before the send, so a failed
    /// delivery leaves a resendable registration behind.
    pub async fn issue_registration(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<(), ApiError> {
        let (code, expires_at) = self.fresh_code();
        self.pending
            .put(PendingRegistration {
                email: email.to_string(),
                username: username.to_string(),
                password_hash: password_hash.to_string(),
                code: code.clone(),
                expires_at,
            })
            .await?;
        debug!(%email, "pending registration stored");

        self.mailer
            .send(
                email,
                "Your OTP for Registration",
                &self.code_body(&code, false),
            )
            .await
            .map_err(|e| {
                warn!(error = %e, %email, "registration OTP send failed");
                ApiError::dependency("Could not send the verification email")
            })
    }

    /// Regenerate code and expiry in place and resend. The replace keeps at
    /// most one code live, so a stale leaked code is useless after a resend.
    pub async fn resend_registration(&self, email: &str) -> Result<(), ApiError> {
        let Some(mut entry) = self.pending.get(email).await? else {
            return Err(ApiError::not_found("No pending registration found"));
        };

        let (code, expires_at) = self.fresh_code();
        entry.code = code.clone();
        entry.expires_at = expires_at;
        self.pending.put(entry).await?;

        self.mailer
            .send(
                email,
                "Your New OTP for Registration",
                &self.code_body(&code, true),
            )
            .await
            .map_err(|e| {
                warn!(error = %e, %email, "registration OTP resend failed");
                ApiError::dependency("Could not send the verification email")
            })
    }

    /// Check a submitted code against the pending entry. Success consumes the
    /// entry and hands its data back for promotion; an expired entry is
    /// discarded so the caller has to restart; a mismatch keeps the entry so
    /// further attempts remain possible until expiry.
    pub async fn verify_registration(
        &self,
        email: &str,
        submitted: &str,
    ) -> Result<PendingRegistration, ApiError> {
        let Some(entry) = self.pending.get(email).await? else {
            return Err(ApiError::validation("No pending registration found"));
        };

        if entry.code != submitted {
            return Err(ApiError::validation("Invalid OTP"));
        }

        if code_state(entry.expires_at, self.clock.now()) == CodeState::Expired {
            self.pending.delete(email).await?;
            return Err(ApiError::validation("OTP expired"));
        }

        self.pending.delete(email).await?;
        Ok(entry)
    }

    /// Email a freshly issued reset code. The code itself is written to the
    /// user row by the caller; this only handles generation and delivery.
    pub async fn send_reset_code(&self, email: &str, code: &str) -> Result<(), ApiError> {
        self.mailer
            .send(
                email,
                "Your OTP for Password Reset",
                &self.code_body(code, false),
            )
            .await
            .map_err(|e| {
                warn!(error = %e, %email, "reset OTP send failed");
                ApiError::dependency("Could not send the reset email")
            })
    }

    /// Validate the reset preconditions on an identity: a code is present,
    /// matches exactly, and is still live. Leaves every field untouched; the
    /// caller applies the reset only on Ok.
    pub fn check_reset_code(&self, user: &User, submitted: &str) -> Result<(), ApiError> {
        let (Some(code), Some(expires_at)) = (&user.reset_code, user.reset_code_expires_at) else {
            return Err(ApiError::validation("Invalid or expired OTP"));
        };
        if code.as_str() != submitted
            || code_state(expires_at, self.clock.now()) == CodeState::Expired
        {
            return Err(ApiError::validation("Invalid or expired OTP"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::pending::MemoryPendingStore;
    use crate::clock::test_support::ManualClock;
    use axum::async_trait;
    use std::sync::Mutex;
    use time::macros::datetime;
    use uuid::Uuid;

    struct RecordingMailer {
        sent: Mutex<Vec<(String, String, String)>>,
    }

    impl RecordingMailer {
        fn new() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
            }
        }

        fn count(&self) -> usize {
            self.sent.lock().unwrap().len()
        }

        fn last_body(&self) -> String {
            self.sent.lock().unwrap().last().unwrap().2.clone()
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
            self.sent
                .lock()
                .unwrap()
                .push((to.into(), subject.into(), body.into()));
            Ok(())
        }
    }

    struct FailingMailer;

    #[async_trait]
    impl Mailer for FailingMailer {
        async fn send(&self, _to: &str, _subject: &str, _body: &str) -> anyhow::Result<()> {
            anyhow::bail!("smtp down")
        }
    }

    struct Harness {
        manager: OtpManager,
        pending: Arc<MemoryPendingStore>,
        mailer: Arc<RecordingMailer>,
        clock: Arc<ManualClock>,
    }

    fn harness() -> Harness {
        let pending = Arc::new(MemoryPendingStore::default());
        let mailer = Arc::new(RecordingMailer::new());
        let clock = Arc::new(ManualClock::starting_at(datetime!(2025-03-01 12:00 UTC)));
        let manager = OtpManager::new(
            pending.clone(),
            mailer.clone(),
            clock.clone(),
            Duration::minutes(5),
        );
        Harness {
            manager,
            pending,
            mailer,
            clock,
        }
    }

    async fn stored_code(h: &Harness, email: &str) -> String {
        h.pending.get(email).await.unwrap().unwrap().code
    }

    #[tokio::test]
    async fn issue_stores_one_entry_and_sends_one_email() {
        let h = harness();
        h.manager
            .issue_registration("alice", "alice@example.com", "$hash")
            .await
            .unwrap();

        let entry = h.pending.get("alice@example.com").await.unwrap().unwrap();
        assert_eq!(entry.username, "alice");
        assert_eq!(entry.code.len(), 6);
        assert!(entry.code.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(entry.expires_at, h.clock.now() + Duration::minutes(5));
        assert_eq!(h.mailer.count(), 1);
        assert!(h.mailer.last_body().contains(&entry.code));
    }

    #[tokio::test]
    async fn correct_code_consumes_the_entry() {
        let h = harness();
        h.manager
            .issue_registration("alice", "alice@example.com", "$hash")
            .await
            .unwrap();
        let code = stored_code(&h, "alice@example.com").await;

        let entry = h
            .manager
            .verify_registration("alice@example.com", &code)
            .await
            .unwrap();
        assert_eq!(entry.password_hash, "$hash");

        // Second attempt: the entry is already consumed.
        let err = h
            .manager
            .verify_registration("alice@example.com", &code)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(m) if m.contains("No pending registration")));
    }

    #[tokio::test]
    async fn wrong_code_is_rejected_but_retained() {
        let h = harness();
        h.manager
            .issue_registration("alice", "alice@example.com", "$hash")
            .await
            .unwrap();
        let code = stored_code(&h, "alice@example.com").await;
        let wrong = if code == "123456" { "654321" } else { "123456" };

        let err = h
            .manager
            .verify_registration("alice@example.com", wrong)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(m) if m == "Invalid OTP"));

        // Still verifiable with the real code.
        assert!(h
            .manager
            .verify_registration("alice@example.com", &code)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn resend_invalidates_the_previous_code() {
        let h = harness();
        h.manager
            .issue_registration("alice", "alice@example.com", "$hash")
            .await
            .unwrap();
        let first = stored_code(&h, "alice@example.com").await;

        h.manager
            .resend_registration("alice@example.com")
            .await
            .unwrap();
        let second = stored_code(&h, "alice@example.com").await;
        assert_eq!(h.mailer.count(), 2);

        if first != second {
            let err = h
                .manager
                .verify_registration("alice@example.com", &first)
                .await
                .unwrap_err();
            assert!(matches!(err, ApiError::Validation(m) if m == "Invalid OTP"));
        }
        assert!(h
            .manager
            .verify_registration("alice@example.com", &second)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn two_resends_leave_exactly_the_latest_code_live() {
        let h = harness();
        h.manager
            .issue_registration("alice", "alice@example.com", "$hash")
            .await
            .unwrap();
        h.manager
            .resend_registration("alice@example.com")
            .await
            .unwrap();
        h.manager
            .resend_registration("alice@example.com")
            .await
            .unwrap();

        let latest = stored_code(&h, "alice@example.com").await;
        assert!(h
            .manager
            .verify_registration("alice@example.com", &latest)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn resend_without_a_pending_entry_is_not_found() {
        let h = harness();
        let err = h
            .manager
            .resend_registration("nobody@example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn expired_code_fails_and_discards_the_entry() {
        let h = harness();
        h.manager
            .issue_registration("alice", "alice@example.com", "$hash")
            .await
            .unwrap();
        let code = stored_code(&h, "alice@example.com").await;

        h.clock.advance(Duration::minutes(5) + Duration::seconds(1));

        let err = h
            .manager
            .verify_registration("alice@example.com", &code)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(m) if m == "OTP expired"));

        // The entry is gone; no further retries.
        let err = h
            .manager
            .verify_registration("alice@example.com", &code)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(m) if m.contains("No pending registration")));
    }

    #[tokio::test]
    async fn the_expiry_instant_itself_is_accepted() {
        let h = harness();
        h.manager
            .issue_registration("alice", "alice@example.com", "$hash")
            .await
            .unwrap();
        let code = stored_code(&h, "alice@example.com").await;

        h.clock.advance(Duration::minutes(5));

        assert!(h
            .manager
            .verify_registration("alice@example.com", &code)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn send_failure_is_a_dependency_error_and_keeps_the_entry() {
        let pending = Arc::new(MemoryPendingStore::default());
        let clock = Arc::new(ManualClock::starting_at(datetime!(2025-03-01 12:00 UTC)));
        let manager = OtpManager::new(
            pending.clone(),
            Arc::new(FailingMailer),
            clock,
            Duration::minutes(5),
        );

        let err = manager
            .issue_registration("alice", "alice@example.com", "$hash")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Dependency(_)));
        // The entry survives so a later resend can retry delivery.
        assert!(pending.get("alice@example.com").await.unwrap().is_some());
    }

    fn user_with_reset(code: Option<&str>, expires_at: Option<OffsetDateTime>) -> User {
        User {
            id: Uuid::new_v4(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            password_hash: Some("$hash".into()),
            bio: None,
            avatar_url: None,
            reset_code: code.map(Into::into),
            reset_code_expires_at: expires_at,
            created_at: datetime!(2025-01-01 00:00 UTC),
        }
    }

    #[tokio::test]
    async fn reset_check_accepts_a_live_matching_code() {
        let h = harness();
        let user = user_with_reset(Some("123456"), Some(h.clock.now() + Duration::minutes(3)));
        assert!(h.manager.check_reset_code(&user, "123456").is_ok());
    }

    #[tokio::test]
    async fn reset_check_rejects_missing_mismatched_or_expired_codes() {
        let h = harness();

        let no_code = user_with_reset(None, None);
        assert!(matches!(
            h.manager.check_reset_code(&no_code, "123456"),
            Err(ApiError::Validation(_))
        ));

        let live = user_with_reset(Some("123456"), Some(h.clock.now() + Duration::minutes(3)));
        assert!(matches!(
            h.manager.check_reset_code(&live, "000000"),
            Err(ApiError::Validation(_))
        ));

        let expired = user_with_reset(Some("123456"), Some(h.clock.now() - Duration::seconds(1)));
        assert!(matches!(
            h.manager.check_reset_code(&expired, "123456"),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn generated_codes_stay_in_the_six_digit_range() {
        for _ in 0..256 {
            let code = generate_code();
            let n: u32 = code.parse().unwrap();
            assert!((100_000..=999_999).contains(&n), "out of range: {}", code);
        }
    }

    #[test]
    fn code_state_boundary_is_inclusive() {
        let expires = datetime!(2025-03-01 12:05 UTC);
        assert_eq!(code_state(expires, expires), CodeState::Live);
        assert_eq!(
            code_state(expires, expires - Duration::seconds(1)),
            CodeState::Live
        );
        assert_eq!(
            code_state(expires, expires + Duration::seconds(1)),
            CodeState::Expired
        );
    }
}
