use tera::{Context, Tera};

const PAYMENT_LINK: &str = "payment_link";
const APPROVAL_DECISION: &str = "approval_decision";
const RENEWAL_REMINDER: &str = "renewal_reminder";

/// Message bodies rendered from embedded templates. Rendering is infallible
/// once construction succeeds, short of a context bug, so errors are
/// propagated as strings rather than swallowed.
pub struct MessageTemplates {
    tera: Tera,
}

impl MessageTemplates {
    pub fn new() -> Result<Self, tera::Error> {
        let mut tera = Tera::default();
        tera.add_raw_template(
            PAYMENT_LINK,
            "Dear {{ customer_name }}, your insurance quote {{ quote_reference }} \
             ({{ plan_name }}) is ready. Complete your payment here: {{ url }}",
        )?;
        tera.add_raw_template(
            APPROVAL_DECISION,
            "{{ agent_name }}, the installment exception for quote \
             {{ quote_reference }} was {% if granted %}approved{% else %}declined{% endif %} \
             by credit control.",
        )?;
        tera.add_raw_template(
            RENEWAL_REMINDER,
            "Dear {{ customer_name }}, your policy {{ policy_number }} expires in \
             {{ days_left }} day{{ days_left | pluralize }}. Contact us to renew your cover.",
        )?;
        Ok(Self { tera })
    }

    pub fn payment_link(
        &self,
        customer_name: &str,
        quote_reference: &str,
        plan_name: &str,
        url: &str,
    ) -> Result<String, tera::Error> {
        let mut context = Context::new();
        context.insert("customer_name", customer_name);
        context.insert("quote_reference", quote_reference);
        context.insert("plan_name", plan_name);
        context.insert("url", url);
        self.tera.render(PAYMENT_LINK, &context)
    }

    pub fn approval_decision(
        &self,
        agent_name: &str,
        quote_reference: &str,
        granted: bool,
    ) -> Result<String, tera::Error> {
        let mut context = Context::new();
        context.insert("agent_name", agent_name);
        context.insert("quote_reference", quote_reference);
        context.insert("granted", &granted);
        self.tera.render(APPROVAL_DECISION, &context)
    }

    pub fn renewal_reminder(
        &self,
        customer_name: &str,
        policy_number: &str,
        days_left: i64,
    ) -> Result<String, tera::Error> {
        let mut context = Context::new();
        context.insert("customer_name", customer_name);
        context.insert("policy_number", policy_number);
        context.insert("days_left", &days_left);
        self.tera.render(RENEWAL_REMINDER, &context)
    }
}
