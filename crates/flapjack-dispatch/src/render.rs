use flapjack_models::{Alert, NotificationType};

#[derive(Debug, Clone, serde::Serialize)]
struct TemplateData<'a> {
    check_summary: &'a str,
    details: Option<&'a str>,
    condition: String,
    attempts: i32,
    is_rollup: bool,
    rollup_count: usize,
}

impl<'a> From<&'a Alert> for TemplateData<'a> {
    fn from(alert: &'a Alert) -> Self {
        TemplateData {
            check_summary: &alert.summary,
            details: alert.details.as_deref(),
            condition: alert.condition.to_string(),
            attempts: alert.attempts,
            is_rollup: alert.rollup_check_ids.is_some(),
            rollup_count: alert.rollup_check_ids.as_ref().map_or(0, Vec::len),
        }
    }
}

pub struct RenderedMessage {
    pub subject: String,
    pub body: String,
}

/// Renders alert subject/body pairs per notification type. One registry is
/// shared across every medium; media differ in how the rendered text is
/// transported, not in what it says.
pub struct Renderer {
    hb: handlebars::Handlebars<'static>,
}

fn template_names(notification_type: NotificationType) -> (String, String) {
    (
        format!("{notification_type}-subject"),
        format!("{notification_type}-body"),
    )
}

impl Renderer {
    pub fn try_new() -> anyhow::Result<Renderer> {
        let mut hb = handlebars::Handlebars::new();
        hb.set_strict_mode(true);
        register_templates(&mut hb)?;
        Ok(Renderer { hb })
    }

    pub fn render(&self, alert: &Alert) -> anyhow::Result<RenderedMessage> {
        let (subject_name, body_name) = template_names(alert.notification_type);
        let data = TemplateData::from(alert);

        let subject = self.hb.render(&subject_name, &data)?;
        let body = self.hb.render(&body_name, &data)?;

        Ok(RenderedMessage { subject, body })
    }
}

fn register_templates(hb: &mut handlebars::Handlebars<'static>) -> anyhow::Result<()> {
    use anyhow::Context;

    hb.register_template_string(
        "problem-subject",
        "{{#if is_rollup}}{{rollup_count}} checks are {{condition}}{{else}}{{condition}}: {{check_summary}}{{/if}}",
    )
    .context("registering problem-subject template")?;
    hb.register_template_string(
        "problem-body",
        "{{#if is_rollup}}{{rollup_count}} checks have reported {{condition}} and were rolled up into this alert.\
{{else}}{{check_summary}}{{#if details}}\n\n{{details}}{{/if}}{{#if attempts}} (attempt {{attempts}}){{/if}}{{/if}}",
    )
    .context("registering problem-body template")?;

    hb.register_template_string("recovery-subject", "Recovery: {{check_summary}}")
        .context("registering recovery-subject template")?;
    hb.register_template_string(
        "recovery-body",
        "{{check_summary}} has recovered.{{#if details}}\n\n{{details}}{{/if}}",
    )
    .context("registering recovery-body template")?;

    hb.register_template_string("acknowledgement-subject", "Acknowledged: {{check_summary}}")
        .context("registering acknowledgement-subject template")?;
    hb.register_template_string(
        "acknowledgement-body",
        "{{check_summary}} has been acknowledged.",
    )
    .context("registering acknowledgement-body template")?;

    hb.register_template_string(
        "scheduled_maintenance-subject",
        "Scheduled maintenance: {{check_summary}}",
    )
    .context("registering scheduled_maintenance-subject template")?;
    hb.register_template_string(
        "scheduled_maintenance-body",
        "{{check_summary}} is entering scheduled maintenance.",
    )
    .context("registering scheduled_maintenance-body template")?;

    hb.register_template_string("test-subject", "Test notification: {{check_summary}}")
        .context("registering test-subject template")?;
    hb.register_template_string("test-body", "{{check_summary}}")
        .context("registering test-body template")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flapjack_models::{Condition, Id, MediumType};

    fn alert(notification_type: NotificationType) -> Alert {
        Alert {
            id: Id::generate(),
            check_id: Id::generate(),
            contact_id: Id::generate(),
            medium_id: Id::generate(),
            medium_type: MediumType::Email,
            notification_type,
            condition: Condition::Critical,
            summary: "web1 connection refused".to_string(),
            details: None,
            attempts: 0,
            enqueued_at: chrono::Utc::now(),
            rollup_check_ids: None,
        }
    }

    #[test]
    fn renders_a_problem_notification() {
        let renderer = Renderer::try_new().unwrap();
        let rendered = renderer.render(&alert(NotificationType::Problem)).unwrap();
        insta::assert_snapshot!(rendered.subject, @"critical: web1 connection refused");
        insta::assert_snapshot!(rendered.body, @"web1 connection refused");
    }

    #[test]
    fn renders_a_recovery_notification() {
        let renderer = Renderer::try_new().unwrap();
        let rendered = renderer.render(&alert(NotificationType::Recovery)).unwrap();
        assert_eq!(rendered.subject, "Recovery: web1 connection refused");
    }

    #[test]
    fn renders_a_rollup_digest() {
        let renderer = Renderer::try_new().unwrap();
        let mut a = alert(NotificationType::Problem);
        a.rollup_check_ids = Some(vec![Id::generate(), Id::generate(), Id::generate()]);
        let rendered = renderer.render(&a).unwrap();
        assert!(rendered.subject.contains("3 checks"));
    }
}
