use std::sync::Arc;

use handlebars::Handlebars;
use serde_json::json;

use crate::{error::NotifyError, models::Alert, services::notifier::Message};

pub type Hbs = Arc<Handlebars<'static>>;

// Subject and text are plain text, so values go through triple-stash unescaped.
const TRIGGERED_SUBJECT: &str = "Price Alert: {{{name}}} Hit Target!";

const TRIGGERED_TEXT: &str = "{{{name}}} ({{{symbol}}}) has reached your target price of ${{{target}}}.
Current Price: ${{{price}}}";

const TRIGGERED_HTML: &str = r#"<h1>Price Alert Triggered!</h1>
<p><strong>{{name}}</strong> ({{symbol}}) has reached your target price.</p>
<ul>
    <li><strong>Target Price:</strong> ${{target}}</li>
    <li><strong>Current Price:</strong> ${{price}}</li>
    <li><strong>Condition:</strong> {{direction}}</li>
</ul>"#;

pub fn build_handlebars() -> Hbs {
    let mut hb = Handlebars::new();
    hb.set_strict_mode(true);

    register(&mut hb, "emails/triggered_subject", TRIGGERED_SUBJECT);
    register(&mut hb, "emails/triggered_text", TRIGGERED_TEXT);
    register(&mut hb, "emails/triggered_html", TRIGGERED_HTML);

    Arc::new(hb)
}

fn register(hb: &mut Handlebars<'static>, name: &str, tpl: &str) {
    // Templates are compile-time constants; a parse error here is a bug caught by tests.
    if let Err(e) = hb.register_template_string(name, tpl) {
        tracing::error!(template = name, error = %e, "failed to register template");
    }
}

/// Renders the notification for an alert that just fired at `price`.
pub fn render_triggered(hbs: &Handlebars<'static>, alert: &Alert, price: f64) -> Result<Message, NotifyError> {
    let ctx = json!({
        "name": alert.asset_name,
        "symbol": alert.asset_symbol.to_uppercase(),
        "target": alert.target_price.to_string(),
        "price": price.to_string(),
        "direction": alert.direction.as_str(),
    });

    let subject = hbs.render("emails/triggered_subject", &ctx)?;
    let text = hbs.render("emails/triggered_text", &ctx)?;
    let html = hbs.render("emails/triggered_html", &ctx)?;

    Ok(Message {
        subject,
        text,
        html: Some(html),
    })
}
