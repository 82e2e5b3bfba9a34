//! Document shell shared by every page.

use maud::{html, Markup, PreEscaped, DOCTYPE};

use super::auth_button::auth_button;
use super::toast::Toast;
use crate::session::SessionStatus;

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; margin: 0; color: #111; }
header { display: flex; justify-content: space-between; align-items: center; padding: 0.75rem 2rem; border-bottom: 1px solid #000; }
main { max-width: 60rem; margin: 0 auto; padding: 2rem; }
.button, .auth-button { padding: 0.4rem 1.2rem; border: 1px solid #000; border-radius: 4px; background: #fff; color: #000; font-weight: bold; text-decoration: none; }
.auth-button[disabled] { opacity: 0.3; cursor: not-allowed; }
.muted, .hint { color: #666; }
.field-error { color: #c00; font-weight: bold; }
.editor { min-height: 10rem; border: 1px solid #999; padding: 0.5rem; }
.toast { position: fixed; top: 1rem; right: 1rem; padding: 0.75rem 1.25rem; border: 1px solid #000; background: #fff; }
.toast-success { border-color: #2a7; }
.toast-error { border-color: #c00; }
.toast-progress { position: static; }
[data-progress]:not([hidden]) { position: fixed; inset: 0; display: grid; place-items: center; background: rgba(255,255,255,0.8); }
table { width: 100%; border-collapse: collapse; }
td, th { text-align: left; padding: 0.4rem; border-bottom: 1px solid #ddd; }
"#;

/// Dismisses timed toasts and copies the editor's HTML into the form field
/// before an issue form submits.
const SCRIPT: &str = r#"
document.querySelectorAll('[data-dismiss-after]').forEach(function (el) {
  setTimeout(function () { el.remove(); }, Number(el.dataset.dismissAfter));
});
document.querySelectorAll('form[data-issue-form]').forEach(function (form) {
  form.addEventListener('submit', function () {
    form.querySelector('input[name=body]').value = form.querySelector('[data-editor]').innerHTML;
    var progress = form.querySelector('[data-progress]');
    if (progress) { progress.hidden = false; }
  });
});
"#;

pub fn base_document(
    title: &str,
    status: &SessionStatus,
    toast: Option<&Toast>,
    body: Markup,
) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) " · issue-desk" }
                style { (PreEscaped(STYLE)) }
            }
            body {
                header {
                    a href="/" class="brand" { "issue-desk" }
                    (auth_button(status))
                }
                @if let Some(toast) = toast {
                    (toast.render())
                }
                (body)
                script { (PreEscaped(SCRIPT)) }
            }
        }
    }
}
