//! Server-rendered pages.
//!
//! Handlebars escapes every `{{value}}`, so display text and form values
//! captured from users are safe to echo back.

use handlebars::Handlebars;
use serde::Serialize;

use crate::confirm::error::ConfirmationError;
use crate::confirm::types::{DisplayModel, FormData};

const CONFIRMATION_TEMPLATE: &str = "confirmation";
const APPLICATION_FORM_TEMPLATE: &str = "application_form";
const APPLICATION_SUBMITTED_TEMPLATE: &str = "application_submitted";

/// Generic error page. Carries no request-specific detail.
pub const ERROR_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Sorry, there is a problem with the service</title>
</head>
<body>
    <main>
        <h1>Sorry, there is a problem with the service</h1>
        <p>Try again later.</p>
        <p><a href="/">Return to the start page</a></p>
    </main>
</body>
</html>
"#;

const CONFIRMATION_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{{#if model.validation_error}}Error: {{/if}}{{model.title}}</title>
</head>
<body>
    <main>
        <form method="post" action="{{action}}" novalidate>
            <input type="hidden" name="token" value="{{model.token}}">
            <fieldset>
                <legend><h1>{{model.title}}</h1></legend>
                <p>{{model.body}}</p>
                {{#if model.validation_error}}
                <p id="Confirmed-error" class="error-message">{{model.validation_error}}</p>
                {{/if}}
                <div class="radios">
                    <label><input type="radio" name="Confirmed" value="true"> {{model.confirm_label}}</label>
                    <label><input type="radio" name="Confirmed" value="false"> {{model.decline_label}}</label>
                </div>
            </fieldset>
            <button type="submit">Continue</button>
        </form>
    </main>
</body>
</html>
"#;

const APPLICATION_FORM_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Your application</title>
</head>
<body>
    <main>
        <h1>Your application</h1>
        <form method="post" action="{{action}}">
            <label for="name">Full name</label>
            <input id="name" name="name" type="text">
            <label for="email">Email address</label>
            <input id="email" name="email" type="email">
            <button type="submit">Submit application</button>
        </form>
    </main>
</body>
</html>
"#;

const APPLICATION_SUBMITTED_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Application submitted</title>
</head>
<body>
    <main>
        <h1>Application submitted</h1>
        <dl>
            {{#each fields}}
            <dt>{{this.[0]}}</dt>
            <dd>{{this.[1]}}</dd>
            {{/each}}
        </dl>
    </main>
</body>
</html>
"#;

#[derive(Serialize)]
struct ConfirmationView<'a> {
    model: &'a DisplayModel,
    action: &'a str,
}

#[derive(Serialize)]
struct ApplicationFormView<'a> {
    action: &'a str,
}

#[derive(Serialize)]
struct ApplicationSubmittedView<'a> {
    fields: &'a FormData,
}

/// Renders every page the service serves.
pub struct PageRenderer {
    handlebars: Handlebars<'static>,
}

impl PageRenderer {
    pub fn new() -> Result<Self, ConfirmationError> {
        let mut handlebars = Handlebars::new();
        for (name, source) in [
            (CONFIRMATION_TEMPLATE, CONFIRMATION_HTML),
            (APPLICATION_FORM_TEMPLATE, APPLICATION_FORM_HTML),
            (APPLICATION_SUBMITTED_TEMPLATE, APPLICATION_SUBMITTED_HTML),
        ] {
            handlebars
                .register_template_string(name, source)
                .map_err(|e| ConfirmationError::Render(format!("{name}: {e}")))?;
        }
        Ok(Self { handlebars })
    }

    /// Confirmation screen posting back to `action`.
    pub fn confirmation(
        &self,
        model: &DisplayModel,
        action: &str,
    ) -> Result<String, ConfirmationError> {
        self.render(CONFIRMATION_TEMPLATE, &ConfirmationView { model, action })
    }

    pub fn application_form(&self, action: &str) -> Result<String, ConfirmationError> {
        self.render(APPLICATION_FORM_TEMPLATE, &ApplicationFormView { action })
    }

    pub fn application_submitted(&self, fields: &FormData) -> Result<String, ConfirmationError> {
        self.render(
            APPLICATION_SUBMITTED_TEMPLATE,
            &ApplicationSubmittedView { fields },
        )
    }

    fn render<T: Serialize>(&self, name: &str, data: &T) -> Result<String, ConfirmationError> {
        self.handlebars
            .render(name, data)
            .map_err(|e| ConfirmationError::Render(format!("{name}: {e}")))
    }
}
