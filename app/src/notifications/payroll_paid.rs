use campus::export::format_minor_units;
use campus::notification::{MailMessage, Notifiable, Notification};
use serde_json::{json, Value};

use crate::models::payrolls;

/// Sent to a staff member's account when their payroll is paid
pub struct PayrollPaid {
    pub payroll_id: i64,
    pub month: i32,
    pub year: i32,
    pub net_salary: i64,
    pub payment_reference: Option<String>,
}

impl PayrollPaid {
    pub fn new(payroll: &payrolls::Model) -> Self {
        Self {
            payroll_id: payroll.id,
            month: payroll.month,
            year: payroll.year,
            net_salary: payroll.net_salary,
            payment_reference: payroll.payment_reference.clone(),
        }
    }

    fn period(&self) -> String {
        format!("{:02}/{}", self.month, self.year)
    }
}

impl Notification for PayrollPaid {
    fn kind(&self) -> &'static str {
        "payroll_paid"
    }

    fn to_database(&self) -> Value {
        json!({
            "payroll_id": self.payroll_id,
            "period": self.period(),
            "net_salary": self.net_salary,
            "payment_reference": self.payment_reference,
        })
    }

    fn to_mail(&self, notifiable: &Notifiable) -> Option<MailMessage> {
        let mut message = MailMessage::new(&notifiable.email, format!("Salary paid for {}", self.period()))
            .to_name(&notifiable.name)
            .line(format!("Hello {},", notifiable.name))
            .line(format!(
                "Your salary of {} for {} has been paid.",
                format_minor_units(self.net_salary),
                self.period()
            ));
        if let Some(reference) = &self.payment_reference {
            message = message.line(format!("Payment reference: {}", reference));
        }
        Some(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mail_mentions_amount_and_reference() {
        let paid = PayrollPaid {
            payroll_id: 4,
            month: 3,
            year: 2025,
            net_salary: 123_456,
            payment_reference: Some("TRX-9".to_string()),
        };
        let mail = paid
            .to_mail(&Notifiable::new(1, "amy@hillside.test", "Amy"))
            .unwrap();

        assert_eq!(mail.subject, "Salary paid for 03/2025");
        assert!(mail.body.contains("1234.56"));
        assert!(mail.body.contains("TRX-9"));
        assert_eq!(paid.to_database()["period"], "03/2025");
    }
}
