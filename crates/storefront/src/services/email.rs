//! Transactional email for order confirmations.
//!
//! Uses SMTP via lettre for delivery with Askama HTML and text templates.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::EmailConfig;
use crate::models::{Order, OrderItem};

/// One line of the confirmation email, preformatted.
#[derive(Debug, Clone)]
pub struct ConfirmationLine {
    pub name: String,
    pub quantity: i32,
    pub subtotal: String,
}

impl ConfirmationLine {
    fn from_item(item: &OrderItem, symbol: &str) -> Self {
        Self {
            name: item.product_name.clone(),
            quantity: item.quantity,
            subtotal: format!("{symbol}{:.2}", item.subtotal),
        }
    }
}

/// HTML template for the order confirmation.
#[derive(Template)]
#[template(path = "email/order_confirmation.html")]
struct OrderConfirmationHtml<'a> {
    customer_name: &'a str,
    gateway_order_id: &'a str,
    lines: &'a [ConfirmationLine],
    total: &'a str,
    invoice_url: &'a str,
}

/// Plain text template for the order confirmation.
#[derive(Template)]
#[template(path = "email/order_confirmation.txt")]
struct OrderConfirmationText<'a> {
    customer_name: &'a str,
    gateway_order_id: &'a str,
    lines: &'a [ConfirmationLine],
    total: &'a str,
    invoice_url: &'a str,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port);

        if let (Some(username), Some(password)) = (&config.smtp_username, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(
                username.clone(),
                password.expose_secret().to_owned(),
            ));
        }

        Ok(Self {
            mailer: builder.build(),
            from_address: config.from_address.clone(),
        })
    }

    /// Send the "order confirmed" email after a successful payment.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_order_confirmation(
        &self,
        to: &str,
        customer_name: &str,
        order: &Order,
        items: &[OrderItem],
        invoice_url: &str,
    ) -> Result<(), EmailError> {
        let symbol = order
            .currency
            .parse::<bazaar_core::CurrencyCode>()
            .map_or("", bazaar_core::CurrencyCode::symbol);
        let lines: Vec<ConfirmationLine> = items
            .iter()
            .map(|item| ConfirmationLine::from_item(item, symbol))
            .collect();
        let total = format!("{symbol}{:.2}", order.amount);

        let html = OrderConfirmationHtml {
            customer_name,
            gateway_order_id: &order.gateway_order_id,
            lines: &lines,
            total: &total,
            invoice_url,
        }
        .render()?;
        let text = OrderConfirmationText {
            customer_name,
            gateway_order_id: &order.gateway_order_id,
            lines: &lines,
            total: &total,
            invoice_url,
        }
        .render()?;

        let subject = format!("Order Confirmed - {}", order.gateway_order_id);
        self.send_multipart_email(to, &subject, &text, &html).await
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        self.mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use bazaar_core::{OrderId, OrderItemId, ProductId};

    use super::*;

    fn lines() -> Vec<ConfirmationLine> {
        let item = OrderItem {
            id: OrderItemId::new(1),
            order_id: OrderId::new(9),
            product_id: Some(ProductId::new(3)),
            product_name: "Brass Lamp".to_owned(),
            product_price: Decimal::new(45_000, 2),
            product_image: None,
            quantity: 2,
            subtotal: Decimal::new(90_000, 2),
        };
        vec![ConfirmationLine::from_item(&item, "₹")]
    }

    #[test]
    fn test_line_formatting() {
        let lines = lines();
        assert_eq!(lines[0].subtotal, "₹900.00");
        assert_eq!(lines[0].quantity, 2);
    }

    #[test]
    fn test_text_template_renders_lines() {
        let lines = lines();
        let text = OrderConfirmationText {
            customer_name: "Asha",
            gateway_order_id: "order_ABC",
            lines: &lines,
            total: "₹810.00",
            invoice_url: "https://shop.example/cart/invoice/9",
        }
        .render()
        .unwrap();

        assert!(text.contains("Hi Asha"));
        assert!(text.contains("order_ABC"));
        assert!(text.contains("Brass Lamp x 2"));
        assert!(text.contains("₹810.00"));
        assert!(text.contains("https://shop.example/cart/invoice/9"));
    }

    #[test]
    fn test_html_template_escapes_names() {
        let lines = vec![ConfirmationLine {
            name: "<b>Lamp</b>".to_owned(),
            quantity: 1,
            subtotal: "₹1.00".to_owned(),
        }];
        let html = OrderConfirmationHtml {
            customer_name: "Asha",
            gateway_order_id: "order_ABC",
            lines: &lines,
            total: "₹1.00",
            invoice_url: "https://shop.example/cart/invoice/9",
        }
        .render()
        .unwrap();

        assert!(!html.contains("<b>Lamp</b>"));
        assert!(html.contains("&#60;b&#62;Lamp") || html.contains("&lt;b&gt;Lamp"));
    }
}
