use async_trait::async_trait;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: Mail) -> anyhow::Result<()>;
}

/// Writes outgoing mail to the log instead of delivering it.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: Mail) -> anyhow::Result<()> {
        info!(to = %mail.to, subject = %mail.subject, body = %mail.body, "mail");
        Ok(())
    }
}

pub fn verification_mail(to: &str, username: &str, code: &str) -> Mail {
    Mail {
        to: to.to_string(),
        subject: "Verify your account".into(),
        body: format!("Hello {username},\n\nyour verification code is: {code}\n"),
    }
}

pub fn password_reset_mail(to: &str, username: &str, code: &str) -> Mail {
    Mail {
        to: to.to_string(),
        subject: "Reset your password".into(),
        body: format!(
            "Hello {username},\n\nuse this code to reset your password: {code}\n\
             Ignore this message if you did not ask for it.\n"
        ),
    }
}

/// Keeps every message in memory so tests can read the codes back.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingMailer {
    pub sent: std::sync::Mutex<Vec<Mail>>,
}

#[cfg(test)]
impl RecordingMailer {
    pub fn messages(&self) -> Vec<Mail> {
        self.sent.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: Mail) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(mail);
        Ok(())
    }
}
