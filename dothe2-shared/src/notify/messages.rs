//! Message bodies for the login flow

use super::Notification;

/// Sign-in message carrying both the code and the magic link
pub fn login_message(
    recipient: &str,
    name: &str,
    magic_link: &str,
    code: &str,
    expires_in_minutes: i64,
) -> Notification {
    let text = format!(
        "Hi {name}!\n\n\
         You requested to sign in to your Dothe2 account.\n\n\
         Your verification code is: {code}\n\n\
         Or open this link to sign in instantly:\n{magic_link}\n\n\
         This link and code will expire in {expires_in_minutes} minutes.\n\
         If you didn't request this, please ignore this email.\n"
    );

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<body style="font-family: sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
  <h2>Hi {name}!</h2>
  <p>You requested to sign in to your Dothe2 account.</p>
  <p><strong>Your verification code is:</strong></p>
  <div style="font-size: 32px; letter-spacing: 8px; font-weight: bold;">{code}</div>
  <p><strong>Or click the button below to sign in instantly:</strong></p>
  <a href="{magic_link}">Sign In to Dothe2</a>
  <p style="color: #dc3545;">This link and code will expire in {expires_in_minutes} minutes.<br>
  If you didn't request this, please ignore this email.</p>
  <p style="font-size: 12px; word-break: break-all;">{magic_link}</p>
</body>
</html>"#
    );

    Notification {
        recipient: recipient.to_string(),
        subject: "Sign in to Dothe2".to_string(),
        text,
        html,
    }
}

/// Sent once, when an account is created
pub fn welcome_message(recipient: &str, name: &str, app_url: &str) -> Notification {
    let text = format!(
        "Welcome to Dothe2, {name}!\n\n\
         Dothe2 helps you organize your tasks using the Eisenhower Matrix:\n\
         - organize tasks by urgency and importance\n\
         - focus on what matters most\n\
         - track your progress\n\n\
         Get started at {app_url}\n"
    );

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<body style="font-family: sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
  <h1>Welcome to Dothe2, {name}!</h1>
  <p>Dothe2 helps you organize your tasks efficiently using the Eisenhower Matrix.</p>
  <ul>
    <li>Organize tasks by urgency and importance</li>
    <li>Focus on what matters most</li>
    <li>Track your progress</li>
  </ul>
  <a href="{app_url}">Go to Dothe2</a>
</body>
</html>"#
    );

    Notification {
        recipient: recipient.to_string(),
        subject: "Welcome to Dothe2!".to_string(),
        text,
        html,
    }
}
