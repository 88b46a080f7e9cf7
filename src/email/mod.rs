use lettre::{
    message::{header::ContentType, Mailbox, Message},
    transport::smtp::authentication::Credentials,
    SmtpTransport, Transport,
};
use uuid::Uuid;

use crate::config::SmtpConfig;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Invalid address: {0}")]
    Address(String),
    #[error("Failed to build email: {0}")]
    Build(String),
    #[error("SMTP error: {0}")]
    Smtp(String),
}

/// Outbound notification email. Delivery is advisory: the persisted
/// notification row is the durable record, a failed send is only logged.
pub struct Mailer {
    transport: SmtpTransport,
    from: Mailbox,
    dashboard_url: String,
}

impl Mailer {
    /// Returns `None` when no SMTP host is configured.
    pub fn from_config(cfg: &SmtpConfig) -> Result<Option<Self>, MailError> {
        let Some(host) = &cfg.host else {
            return Ok(None);
        };

        let transport = match (&cfg.username, &cfg.password) {
            (Some(user), Some(pass)) => SmtpTransport::relay(host)
                .map_err(|e| MailError::Smtp(e.to_string()))?
                .credentials(Credentials::new(user.clone(), pass.clone()))
                .build(),
            _ => SmtpTransport::builder_dangerous(host).build(),
        };

        let from = cfg
            .from
            .parse()
            .map_err(|e: lettre::address::AddressError| MailError::Address(e.to_string()))?;

        Ok(Some(Self {
            transport,
            from,
            dashboard_url: cfg.dashboard_url.clone(),
        }))
    }

    pub fn send_ticket_notification(
        &self,
        to: &str,
        admin_name: &str,
        ticket_title: &str,
        submitter_name: &str,
        submitter_division: &str,
        ticket_id: Uuid,
    ) -> Result<(), MailError> {
        let body = format!(
            "Halo {admin_name},\n\n\
             Ada tiket baru yang masuk di sistem Helpdesk.\n\n\
             Judul Tiket: {ticket_title}\n\
             Dari: {submitter_name}\n\
             Divisi: {submitter_division}\n\
             ID Tiket: {ticket_id}\n\n\
             Silakan login ke dashboard admin untuk melihat detail tiket:\n\
             {}/admin/dashboard\n\n\
             Pesan ini adalah notifikasi otomatis, jangan dibalas.\n",
            self.dashboard_url
        );

        let email = Message::builder()
            .from(self.from.clone())
            .to(to
                .parse()
                .map_err(|e: lettre::address::AddressError| MailError::Address(e.to_string()))?)
            .subject(format!("[HELPDESK] Tiket Baru: {ticket_title}"))
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| MailError::Build(e.to_string()))?;

        self.transport
            .send(&email)
            .map_err(|e| MailError::Smtp(e.to_string()))?;

        Ok(())
    }
}
