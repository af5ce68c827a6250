//! HTML rendering for the prediction page

use std::fmt::Write;

use crate::models::{FieldKind, PredictionRequest, FIELDS};

const TITLE: &str = "🍬🩺 Diabetes Prediction App";

/// Message shown under the form
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Success(String),
    Error(String),
    Warning(String),
}

impl Notice {
    fn class(&self) -> &'static str {
        match self {
            Notice::Success(_) => "success",
            Notice::Error(_) => "error",
            Notice::Warning(_) => "warning",
        }
    }

    fn text(&self) -> &str {
        match self {
            Notice::Success(t) | Notice::Error(t) | Notice::Warning(t) => t,
        }
    }
}

/// Render the page; `values` refills the inputs after a submit
pub fn page(values: Option<&PredictionRequest>, notices: &[Notice]) -> String {
    let mut html = String::with_capacity(4096);

    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Diabetes Prediction App</title>\n<style>{STYLE}</style>\n</head>\n<body>\n\
         <main>\n<h1>{TITLE}</h1>\n"
    );

    html.push_str("<form method=\"post\" action=\"/predict\" id=\"prediction_form\">\n");

    let current = values.map(PredictionRequest::features);
    for (i, field) in FIELDS.iter().enumerate() {
        let (min, step, default) = match field.kind {
            FieldKind::Integer => ("0", "1", "0"),
            FieldKind::Float => ("0.0", "any", "0.00"),
        };
        let value = current
            .map(|features| features[i].to_string())
            .unwrap_or_else(|| default.to_string());

        let _ = write!(
            html,
            "<label for=\"{name}\">{label}</label>\n\
             <input type=\"number\" id=\"{name}\" name=\"{name}\" min=\"{min}\" step=\"{step}\" \
             value=\"{value}\" required>\n",
            name = field.name,
            label = escape(field.label),
            value = escape(&value),
        );
    }

    html.push_str("<button type=\"submit\">Predict</button>\n</form>\n");

    for notice in notices {
        let _ = write!(
            html,
            "<div class=\"notice {}\" role=\"status\">{}</div>\n",
            notice.class(),
            escape(notice.text())
        );
    }

    html.push_str("</main>\n</body>\n</html>\n");
    html
}

/// Minimal HTML text escaping for values placed in element bodies and attributes
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

const STYLE: &str = "\
body{font-family:sans-serif;background:#fafafa;margin:0}\
main{max-width:640px;margin:2rem auto;padding:0 1rem}\
label{display:block;margin-top:.75rem;font-size:.9rem}\
input{width:100%;padding:.4rem;box-sizing:border-box}\
button{margin-top:1rem;padding:.5rem 1.5rem}\
.notice{margin-top:1rem;padding:.75rem;border-radius:.3rem}\
.success{background:#e6f4ea;color:#1e6b34}\
.error{background:#fdecea;color:#8a1c1c}\
.warning{background:#fff8e1;color:#7a5b00}";
