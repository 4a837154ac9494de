//! Per-flow mail contexts: subject, plain body, HTML body, addressing.

use crate::auth::repo::User;
use crate::config::AppConfig;
use crate::contact::repo::Contact;
use crate::scheduler::ReminderNotification;

use super::templates;
use super::MailContext;

pub fn activation_mail(config: &AppConfig, user: &User, key: &str) -> MailContext {
    let full_name = user.full_name();
    let activation_url = format!("{}/api/v1/auth/activate/{}", config.domain, key);
    MailContext {
        subject: "Activate Your Account".into(),
        body: format!(
            "Doable\nHello, {full_name}\nActivate Your Account = {activation_url}\n"
        ),
        html_body: templates::activation(&full_name, &activation_url),
        from: config.mail.from_address.clone(),
        recipients: vec![user.email.clone()],
    }
}

pub fn forgot_password_mail(config: &AppConfig, user: &User, key: &str) -> MailContext {
    let full_name = user.full_name();
    let reset_url = format!("{}/reset-password/{}", config.domain, key);
    MailContext {
        subject: "Forgot Password".into(),
        body: format!("Doable\nHello, {full_name}\nSet New Password = {reset_url}\n"),
        html_body: templates::forgot_password(&full_name, &reset_url),
        from: config.mail.from_address.clone(),
        recipients: vec![user.email.clone()],
    }
}

pub fn reminder_mail(config: &AppConfig, note: &ReminderNotification) -> MailContext {
    MailContext {
        subject: "Reminder".into(),
        body: format!(
            "Doable\nHello, {}\nIt's time for the task.\n'{}'",
            note.full_name, note.task_title
        ),
        html_body: templates::reminder(&note.full_name, &note.task_title),
        from: config.mail.from_address.clone(),
        recipients: vec![note.recipient.clone()],
    }
}

/// Contact-form submissions go to the operator address.
pub fn contact_mail(config: &AppConfig, contact: &Contact) -> MailContext {
    let full_name = format!("{} {}", contact.first_name, contact.last_name);
    MailContext {
        subject: "New Contact".into(),
        body: format!(
            "Doable\nNew Contact\n{full_name} <{email}>\n{message}\n",
            email = contact.email,
            message = contact.message
        ),
        html_body: templates::contact(&full_name, &contact.email, &contact.message),
        from: config.mail.from_address.clone(),
        recipients: vec![config.mail.admin_address.clone()],
    }
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;
    use uuid::Uuid;

    use super::*;

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "ada@example.com".into(),
            password_hash: "hash".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            is_verified: false,
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn activation_mail_addresses_the_user() {
        let config = AppConfig::for_tests();
        let ctx = activation_mail(&config, &user(), "secret-key");

        assert_eq!(ctx.recipients, vec!["ada@example.com".to_string()]);
        assert_eq!(ctx.subject, "Activate Your Account");
        assert!(ctx
            .body
            .contains("http://test.local/api/v1/auth/activate/secret-key"));
        assert!(ctx.body.contains("Hello, Ada Lovelace"));
        assert_eq!(ctx.from, "noreply@test.local");
    }

    #[test]
    fn reminder_mail_carries_task_title() {
        let config = AppConfig::for_tests();
        let note = ReminderNotification {
            recipient: "ada@example.com".into(),
            full_name: "Ada Lovelace".into(),
            task_title: "Pay bills".into(),
        };
        let ctx = reminder_mail(&config, &note);

        assert_eq!(ctx.subject, "Reminder");
        assert!(ctx.body.contains("'Pay bills'"));
        assert_eq!(ctx.recipients, vec!["ada@example.com".to_string()]);
    }

    #[test]
    fn contact_mail_goes_to_the_operator() {
        let config = AppConfig::for_tests();
        let contact = Contact {
            id: Uuid::new_v4(),
            first_name: "Grace".into(),
            last_name: "Hopper".into(),
            email: "grace@example.com".into(),
            message: "Good job!".into(),
            created_at: OffsetDateTime::UNIX_EPOCH,
        };
        let ctx = contact_mail(&config, &contact);

        assert_eq!(ctx.recipients, vec!["admin@test.local".to_string()]);
        assert!(ctx.body.contains("grace@example.com"));
        assert!(ctx.body.contains("Good job!"));
    }
}
