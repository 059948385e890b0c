//! Order confirmation email.
//!
//! Plain-text transactional mail over SMTP via lettre. When no SMTP relay is
//! configured the mailer runs in log-only mode: the rendered message is
//! logged and delivery is reported as successful, which keeps development
//! environments working without a relay.

use andar_core::{PaymentMethod, ShippingMethod};
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::header::ContentType,
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::SmtpConfig;
use crate::models::order::Order;

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum MailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("invalid email address: {0}")]
    InvalidAddress(String),
}

/// Transactional mailer.
#[derive(Clone)]
pub struct Mailer {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from_address: String,
}

impl Mailer {
    /// Create a mailer from optional SMTP configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the relay address cannot be resolved.
    pub fn new(config: Option<&SmtpConfig>) -> Result<Self, SmtpError> {
        let Some(config) = config else {
            return Ok(Self {
                transport: None,
                from_address: "pedidos@andar.pe".to_string(),
            });
        };

        let credentials = Credentials::new(
            config.username.clone(),
            config.password.expose_secret().to_string(),
        );

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port)
            .credentials(credentials)
            .build();

        Ok(Self {
            transport: Some(transport),
            from_address: config.from_address.clone(),
        })
    }

    /// Send the confirmation for an order to its customer.
    ///
    /// # Errors
    ///
    /// Returns error if the message cannot be built or the relay refuses it.
    pub async fn send_order_confirmation(&self, order: &Order) -> Result<(), MailError> {
        let subject = format!("Andar - confirmación de pedido #{}", order.id);
        let body = render_confirmation(order);

        let Some(transport) = &self.transport else {
            tracing::info!(
                order_id = %order.id,
                recipient = %order.customer_email,
                "SMTP not configured; confirmation logged only:\n{body}"
            );
            return Ok(());
        };

        let message = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| MailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(order
                .customer_email
                .as_str()
                .parse()
                .map_err(|_| MailError::InvalidAddress(order.customer_email.to_string()))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)?;

        transport.send(message).await?;
        Ok(())
    }
}

/// Render the plain-text confirmation body: itemized lines, totals, a
/// delivery or pickup block, and payment instructions for the chosen method.
#[must_use]
pub fn render_confirmation(order: &Order) -> String {
    let mut body = String::new();

    body.push_str(&format!(
        "Hola {},\n\nRecibimos tu pedido #{}. Este es el resumen:\n\n",
        order.customer_name, order.id
    ));

    for line in &order.lines {
        body.push_str(&format!(
            "  {} x{}  (talla {}, {}, SKU {})  S/ {}\n",
            line.product_name,
            line.quantity,
            line.size,
            line.color,
            line.sku,
            line.line_total()
        ));
    }

    body.push_str(&format!(
        "\nSubtotal: S/ {}\nEnvío: S/ {}\nTotal: S/ {}\n\n",
        order.subtotal, order.shipping_cost, order.total
    ));

    match order.shipping_method {
        ShippingMethod::Ship => {
            if let Some(address) = &order.shipping_address {
                body.push_str("Entrega a domicilio:\n");
                body.push_str(&format!("  {}", address.street));
                if let Some(unit) = &address.unit {
                    body.push_str(&format!(" {unit}"));
                }
                body.push_str(&format!("\n  {}, {}\n", address.district, address.city));
                if let Some(reference) = &address.reference {
                    body.push_str(&format!("  Referencia: {reference}\n"));
                }
            }
        }
        ShippingMethod::Pickup => {
            body.push_str(
                "Recojo en tienda:\n  Av. La Marina 2350, San Miguel, Lima\n  \
                 Lunes a sábado de 10:00 a 20:00. Trae tu DNI y el número de pedido.\n",
            );
        }
    }

    body.push('\n');
    body.push_str(&payment_instructions(order));
    body.push_str("\n\nGracias por comprar en Andar.\n");

    body
}

/// Payment block keyed to the method; non-card methods echo the supplied
/// transaction reference so the customer can match it with their receipt.
fn payment_instructions(order: &Order) -> String {
    let reference = order.transaction_reference.as_deref().unwrap_or("-");
    match order.payment_method {
        PaymentMethod::Card => {
            "Pago con tarjeta: el cargo aparece en tu estado de cuenta como ANDAR*PEDIDOS."
                .to_string()
        }
        PaymentMethod::Yape => format!(
            "Pago por Yape: verificaremos tu operación {reference} y te avisaremos \
             cuando el pago quede confirmado."
        ),
        PaymentMethod::Plin => format!(
            "Pago por Plin: verificaremos tu operación {reference} y te avisaremos \
             cuando el pago quede confirmado."
        ),
        PaymentMethod::BankTransfer => format!(
            "Transferencia bancaria: registramos tu operación {reference}. \
             Cuenta BCP 193-XXXXXXX-0-61 a nombre de Andar S.A.C."
        ),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use andar_core::{Email, OrderId, OrderStatus, ProductId};
    use chrono::Utc;
    use rust_decimal::Decimal;

    use crate::models::Address;
    use crate::models::order::OrderLine;

    use super::*;

    fn order(shipping: ShippingMethod, payment: PaymentMethod) -> Order {
        Order {
            id: OrderId::new(81),
            user_id: None,
            customer_name: "Rosa Quispe".to_string(),
            customer_email: Email::parse("rosa@example.com").unwrap(),
            customer_phone: None,
            lines: vec![OrderLine {
                product_id: ProductId::new(1),
                product_name: "Zapatilla Urbana".to_string(),
                size: "40".to_string(),
                color: "Negro".to_string(),
                sku: "URB-40-NEG".to_string(),
                quantity: 2,
                unit_price: Decimal::new(5000, 2),
            }],
            shipping_method: shipping,
            shipping_address: (shipping == ShippingMethod::Ship).then(|| Address {
                street: "Av. Brasil 500".to_string(),
                district: "Magdalena".to_string(),
                city: "Lima".to_string(),
                reference: Some("Frente al parque".to_string()),
                ..Address::default()
            }),
            payment_method: payment,
            transaction_reference: Some("OP-775533".to_string()),
            subtotal: Decimal::new(10000, 2),
            shipping_cost: Decimal::new(1500, 2),
            total: Decimal::new(11500, 2),
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_body_itemizes_lines_and_totals() {
        let body = render_confirmation(&order(ShippingMethod::Ship, PaymentMethod::Card));
        assert!(body.contains("pedido #81"));
        assert!(body.contains("Zapatilla Urbana x2"));
        assert!(body.contains("SKU URB-40-NEG"));
        assert!(body.contains("Subtotal: S/ 100.00"));
        assert!(body.contains("Envío: S/ 15.00"));
        assert!(body.contains("Total: S/ 115.00"));
    }

    #[test]
    fn test_ship_renders_address_block() {
        let body = render_confirmation(&order(ShippingMethod::Ship, PaymentMethod::Card));
        assert!(body.contains("Entrega a domicilio"));
        assert!(body.contains("Av. Brasil 500"));
        assert!(body.contains("Magdalena, Lima"));
        assert!(body.contains("Frente al parque"));
        assert!(!body.contains("Recojo en tienda"));
    }

    #[test]
    fn test_pickup_renders_store_block() {
        let body = render_confirmation(&order(ShippingMethod::Pickup, PaymentMethod::Card));
        assert!(body.contains("Recojo en tienda"));
        assert!(!body.contains("Entrega a domicilio"));
    }

    #[test]
    fn test_wallet_payment_echoes_reference() {
        let body = render_confirmation(&order(ShippingMethod::Pickup, PaymentMethod::Yape));
        assert!(body.contains("Yape"));
        assert!(body.contains("OP-775533"));

        let body = render_confirmation(&order(ShippingMethod::Pickup, PaymentMethod::BankTransfer));
        assert!(body.contains("Transferencia bancaria"));
        assert!(body.contains("OP-775533"));
    }

    #[test]
    fn test_card_payment_has_no_reference() {
        let body = render_confirmation(&order(ShippingMethod::Pickup, PaymentMethod::Card));
        assert!(body.contains("tarjeta"));
        assert!(!body.contains("OP-775533"));
    }
}
