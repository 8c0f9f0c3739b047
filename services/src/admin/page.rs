//! HTML rendering of the onboarding admin page.

use crate::onboarding::{OnboardingError, OnboardingOutcome, OnboardingState, UserProfile};

/// Escapes text for use in HTML content and attribute values.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Profile shown when the page is first opened.
pub fn sample_profile(issuer_domain: &str) -> UserProfile {
    UserProfile::new(
        format!("tst4@{issuer_domain}"),
        "tst4",
        "first-tst4",
        "last-tst4",
    )
}

/// Banner class and text for a failed submission.
fn failure_banner(err: &OnboardingError) -> (&'static str, String) {
    match err {
        OnboardingError::InvalidProfile(msg) => ("error", format!("Please check the form: {msg}")),
        OnboardingError::DomainMismatch { .. } => ("error", err.to_string()),
        OnboardingError::RemoteService(source) => (
            "error",
            format!("The directory rejected the request, no account was created. ({source})"),
        ),
        OnboardingError::PartialProvisioning { account, .. } => (
            "warning",
            format!(
                "Account {} was created, but its temporary access pass is still pending. \
                 Issue one from the directory portal or retry later. Submitting again creates a second account.",
                account.user_principal_name
            ),
        ),
        OnboardingError::InvitationNotConfigured => ("error", err.to_string()),
    }
}

fn outcome_html(outcome: &OnboardingOutcome) -> String {
    match outcome {
        OnboardingOutcome::Member {
            email,
            temporary_pass_code,
            credential,
            ..
        } => format!(
            r#"<div class="result" id="access">
            <h2>Temporary access pass</h2>
            <dl>
                <dt>Email</dt><dd id="result-email">{}</dd>
                <dt>Access code</dt><dd><code id="result-code">{}</code></dd>
                <dt>Valid for</dt><dd>{} minutes{}</dd>
            </dl>
        </div>"#,
            html_escape(email),
            html_escape(temporary_pass_code),
            credential.validity_minutes,
            if credential.single_use {
                ", single use"
            } else {
                ""
            },
        ),
        OnboardingOutcome::Guest {
            email,
            password,
            account,
        } => format!(
            r#"<div class="result" id="guest">
            <h2>Guest account</h2>
            <dl>
                <dt>Email</dt><dd id="result-email">{}</dd>
                <dt>User principal name</dt><dd>{}</dd>
                <dt>Password</dt><dd><code id="result-password">{}</code></dd>
            </dl>
        </div>"#,
            html_escape(email),
            html_escape(&account.user_principal_name),
            html_escape(password),
        ),
    }
}

fn state_html(state: &OnboardingState) -> String {
    match state {
        OnboardingState::Idle | OnboardingState::Submitting => String::new(),
        OnboardingState::Done(outcome) => outcome_html(outcome),
        OnboardingState::Failed(err) => {
            let (class, text) = failure_banner(err);
            format!(
                r#"<div class="{class}" id="banner" data-error="{}">{}</div>"#,
                err.kind(),
                html_escape(&text)
            )
        }
    }
}

fn field(name: &str, label: &str, kind: &str, value: &str) -> String {
    format!(
        r#"<div class="form-group">
                <label for="{name}">{label}</label>
                <input type="{kind}" id="{name}" name="{name}" value="{}" required />
            </div>"#,
        html_escape(value)
    )
}

/// Renders the admin page with the form and the result of the last submission.
pub fn render_onboarding_page(issuer_domain: &str, form: &UserProfile, state: &OnboardingState) -> String {
    let fields = [
        field("email", "Email", "email", &form.email),
        field("user_name", "User name", "text", &form.user_name),
        field("first_name", "First name", "text", &form.first_name),
        field("last_name", "Last name", "text", &form.last_name),
    ]
    .join("\n            ");

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Onboarding Admin</title>
    <style>
        * {{ box-sizing: border-box; margin: 0; padding: 0; }}
        body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; background: #f5f5f5; min-height: 100vh; display: flex; align-items: center; justify-content: center; }}
        .container {{ background: white; padding: 2rem; border-radius: 8px; box-shadow: 0 2px 10px rgba(0,0,0,0.1); max-width: 480px; width: 100%; }}
        h1 {{ font-size: 1.5rem; margin-bottom: 0.5rem; color: #333; }}
        h2 {{ font-size: 1.1rem; margin-bottom: 0.5rem; color: #333; }}
        .subtitle {{ color: #666; margin-bottom: 1.5rem; font-size: 0.9rem; }}
        .form-group {{ margin-bottom: 1rem; }}
        label {{ display: block; margin-bottom: 0.25rem; color: #333; font-weight: 500; font-size: 0.875rem; }}
        input {{ width: 100%; padding: 0.625rem; border: 1px solid #ddd; border-radius: 4px; font-size: 1rem; }}
        button {{ width: 100%; padding: 0.75rem; background: #0066cc; color: white; border: none; border-radius: 4px; font-size: 1rem; cursor: pointer; margin-top: 0.5rem; }}
        .error {{ background: #fee; border: 1px solid #fcc; color: #c00; padding: 0.75rem; border-radius: 4px; margin-bottom: 1rem; font-size: 0.875rem; }}
        .warning {{ background: #fff8e1; border: 1px solid #ffe082; color: #8a6d00; padding: 0.75rem; border-radius: 4px; margin-bottom: 1rem; font-size: 0.875rem; }}
        .result {{ background: #f1f8e9; border: 1px solid #c5e1a5; padding: 1rem; border-radius: 4px; margin-bottom: 1rem; }}
        dt {{ font-size: 0.75rem; color: #666; margin-top: 0.5rem; }}
        code {{ font-size: 1.1rem; }}
    </style>
</head>
<body>
    <div class="container">
        <h1>Onboard a user</h1>
        <p class="subtitle">Emails in <strong>{}</strong> become members and receive a temporary access pass. Other emails become guests.</p>

        {}

        <form method="post" action="/admin/onboarding">
            {fields}
            <button type="submit">Create account</button>
        </form>
    </div>
</body>
</html>"#,
        html_escape(issuer_domain),
        state_html(state),
    )
}
