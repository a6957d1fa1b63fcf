//! # Email Templates
//!
//! HTML bodies for the customer confirmation and the admin notification.
//! Every interpolated value goes through `escape`.

use chrono::{DateTime, Utc};
use pay_core::PaymentConfirmation;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
}

/// Minimal HTML escaping for text and attribute values
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn currency_symbol(code: &str) -> &str {
    match code {
        "INR" => "₹",
        "USD" => "$",
        "EUR" => "€",
        "GBP" => "£",
        other => other,
    }
}

fn amount(c: &PaymentConfirmation) -> String {
    format!("{}{}", currency_symbol(&c.currency), c.amount)
}

pub fn payment_confirmation(
    c: &PaymentConfirmation,
    support_email: &str,
    whatsapp_link: Option<&str>,
) -> RenderedEmail {
    let date = c
        .event_date
        .map(|d| d.format("%A, %d %B %Y").to_string())
        .unwrap_or_else(|| "To be announced".to_string());
    let time = c.event_time.clone().unwrap_or_else(|| "To be announced".to_string());

    let whatsapp = whatsapp_link
        .map(|link| {
            format!(
                r#"
          <li>Join our WhatsApp group for updates and resources</li>
        </ul>
        <p style="text-align: center;">
          <a href="{}" style="background: #2563eb; color: white; padding: 15px 30px; text-decoration: none; border-radius: 8px; display: inline-block;">Join WhatsApp Group</a>
        </p>"#,
                escape(link)
            )
        })
        .unwrap_or_else(|| "\n        </ul>".to_string());

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>Payment Confirmation</title>
</head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
  <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
    <div style="background: #2563eb; color: white; padding: 30px; text-align: center; border-radius: 10px 10px 0 0;">
      <h1>Payment Successful!</h1>
      <p>Registration Confirmed</p>
    </div>
    <div style="background: #f8fafc; padding: 30px; border-radius: 0 0 10px 10px;">
      <h2>Hello {name}!</h2>
      <p>Thank you for registering. Your payment has been successfully processed.</p>
      <div style="background: white; padding: 20px; border-radius: 8px; border-left: 4px solid #2563eb;">
        <h3>Event Details:</h3>
        <p><strong>Event:</strong> {event}</p>
        <p><strong>Date:</strong> {date}</p>
        <p><strong>Time:</strong> {time}</p>
        <p><strong>Amount Paid:</strong> {amount}</p>
        <p><strong>Payment ID:</strong> {payment_id}</p>
        <p><strong>Order ID:</strong> {order_id}</p>
      </div>
      <h3>What's Next?</h3>
      <ul>
          <li>You'll receive event materials before the event</li>
          <li>Check your email regularly for important updates</li>{whatsapp}
      <p><strong>Need Help?</strong><br>Contact us at: {support}</p>
      <p style="text-align: center; color: #6b7280; font-size: 14px;">
        This is an automated confirmation email. Please do not reply to this email.
      </p>
    </div>
  </div>
</body>
</html>
"#,
        name = escape(&c.customer_name),
        event = escape(&c.event_title),
        date = escape(&date),
        time = escape(&time),
        amount = escape(&amount(c)),
        payment_id = escape(&c.payment_id),
        order_id = escape(&c.order_id),
        whatsapp = whatsapp,
        support = escape(support_email),
    );

    RenderedEmail {
        subject: format!("Payment Confirmed: {}", c.event_title),
        html,
    }
}

pub fn admin_notification(c: &PaymentConfirmation, received_at: DateTime<Utc>) -> RenderedEmail {
    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>New Payment Received</title>
</head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
  <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
    <div style="background: #10b981; color: white; padding: 20px; text-align: center;">
      <h1>New Payment Received</h1>
    </div>
    <div style="background: #f9f9f9; padding: 20px;">
      <div style="background: white; padding: 15px; margin: 10px 0; border-left: 4px solid #10b981;">
        <h3>Customer Details:</h3>
        <p><strong>Name:</strong> {name}</p>
        <p><strong>Email:</strong> {email}</p>
        <p><strong>Mobile:</strong> {mobile}</p>
      </div>
      <div style="background: white; padding: 15px; margin: 10px 0; border-left: 4px solid #10b981;">
        <h3>Payment Details:</h3>
        <p><strong>Event:</strong> {event}</p>
        <p><strong>Amount:</strong> {amount}</p>
        <p><strong>Payment ID:</strong> {payment_id}</p>
        <p><strong>Order ID:</strong> {order_id}</p>
        <p><strong>Timestamp:</strong> {timestamp}</p>
      </div>
    </div>
  </div>
</body>
</html>
"#,
        name = escape(&c.customer_name),
        email = escape(&c.customer_email),
        mobile = escape(&c.customer_mobile),
        event = escape(&c.event_title),
        amount = escape(&amount(c)),
        payment_id = escape(&c.payment_id),
        order_id = escape(&c.order_id),
        timestamp = received_at.to_rfc3339(),
    );

    RenderedEmail {
        subject: format!("New Payment Received - {}", c.event_title),
        html,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use rust_decimal::Decimal;

    fn confirmation() -> PaymentConfirmation {
        PaymentConfirmation {
            customer_name: "Asha <Rao>".into(),
            customer_email: "asha@example.com".into(),
            customer_mobile: "9800000000".into(),
            event_title: "GST Workshop".into(),
            event_date: NaiveDate::from_ymd_opt(2025, 3, 15),
            event_time: Some("18:30".into()),
            amount: Decimal::new(50000, 2),
            currency: "INR".into(),
            payment_id: "pay_001".into(),
            order_id: "order_001".into(),
        }
    }

    #[test]
    fn test_escape() {
        assert_eq!(
            escape(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_confirmation_contents() {
        let email = payment_confirmation(
            &confirmation(),
            "help@example.com",
            Some("https://chat.whatsapp.com/abc"),
        );

        assert_eq!(email.subject, "Payment Confirmed: GST Workshop");
        assert!(email.html.contains("Hello Asha &lt;Rao&gt;!"));
        assert!(email.html.contains("₹500.00"));
        assert!(email.html.contains("Saturday, 15 March 2025"));
        assert!(email.html.contains("pay_001"));
        assert!(email.html.contains("order_001"));
        assert!(email.html.contains("https://chat.whatsapp.com/abc"));
        assert!(email.html.contains("help@example.com"));
    }

    #[test]
    fn test_confirmation_without_event_details() {
        let mut c = confirmation();
        c.event_date = None;
        c.event_time = None;
        let email = payment_confirmation(&c, "help@example.com", None);
        assert!(email.html.contains("To be announced"));
        assert!(!email.html.contains("WhatsApp"));
    }

    #[test]
    fn test_admin_notification() {
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap();
        let email = admin_notification(&confirmation(), at);
        assert_eq!(email.subject, "New Payment Received - GST Workshop");
        assert!(email.html.contains("asha@example.com"));
        assert!(email.html.contains("9800000000"));
        assert!(email.html.contains("2025-03-01T10:00:00+00:00"));
    }
}
