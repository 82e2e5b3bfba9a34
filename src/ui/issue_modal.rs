use maud::{html, Markup, PreEscaped};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{error, info, warn};

use super::api::IssueApi;
use super::toast::Toast;
use crate::github::{IssueParams, IssuePayload, RepoRef};
use crate::markdown;
use crate::session::Session;

pub const MIN_BODY_CHARS: usize = 30;

/// Raw form fields. `body` holds the editor's HTML.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct IssueForm {
    pub title: String,
    pub body: String,
}

impl IssueForm {
    /// Pre-populate from an issue: the Markdown body becomes editor HTML.
    pub fn from_issue(title: &str, body_markdown: &str) -> Self {
        Self {
            title: title.to_string(),
            body: markdown::to_html(body_markdown),
        }
    }

    /// A whitespace-only title counts as empty.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::default();
        if self.title.trim().is_empty() {
            errors.title = Some("Title is required.");
        }
        if self.body.chars().count() < MIN_BODY_CHARS {
            errors.body = Some("Body must be at least 30 characters.");
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// What gets sent upstream: the editor HTML converted to Markdown.
    pub fn to_payload(&self) -> IssuePayload {
        IssuePayload {
            title: self.title.clone(),
            body: markdown::to_markdown(&self.body),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    pub title: Option<&'static str>,
    pub body: Option<&'static str>,
}

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.body.is_none()
    }
}

/// Which issue a modal writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueTarget {
    New(RepoRef),
    Existing(IssueParams),
}

impl IssueTarget {
    fn action(&self) -> String {
        match self {
            IssueTarget::New(repo) => format!("/issues/{}/{}", repo.owner, repo.repo),
            IssueTarget::Existing(params) => {
                format!("/issues/{}/{}/{}", params.owner, params.repo, params.number)
            }
        }
    }

    fn dialog_id(&self) -> &'static str {
        match self {
            IssueTarget::New(_) => "create-issue",
            IssueTarget::Existing(_) => "update-issue",
        }
    }

    /// The one status GitHub answers a successful write with.
    fn success_status(&self) -> StatusCode {
        match self {
            IssueTarget::New(_) => StatusCode::CREATED,
            IssueTarget::Existing(_) => StatusCode::OK,
        }
    }

    fn success_toast(&self) -> Toast {
        match self {
            IssueTarget::New(_) => Toast::success("Create successfully"),
            IssueTarget::Existing(_) => Toast::success("Update successfully"),
        }
    }

    fn progress_toast(&self) -> Toast {
        match self {
            IssueTarget::New(_) => Toast::progress("Creating Issue", "Please wait..."),
            IssueTarget::Existing(_) => Toast::progress("Updating Issue", "Please wait..."),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalPhase {
    Closed,
    Editing,
    Submitting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Validation failed; nothing was sent.
    Invalid,
    /// Upstream accepted the write; the modal closed and `mutate` ran.
    Saved,
    /// A 2xx other than the expected one. The modal stays as it was.
    Unacknowledged(StatusCode),
    /// The request failed; an error toast is shown and the modal stays open.
    Failed,
}

/// Create / update issue dialog.
#[derive(Debug, Clone)]
pub struct IssueModal {
    target: IssueTarget,
    form: IssueForm,
    phase: ModalPhase,
    errors: FieldErrors,
    toast: Option<Toast>,
}

impl IssueModal {
    pub fn create(repo: RepoRef) -> Self {
        Self::with_form(IssueTarget::New(repo), IssueForm::default())
    }

    pub fn update(params: IssueParams, title: &str, body_markdown: &str) -> Self {
        Self::with_form(
            IssueTarget::Existing(params),
            IssueForm::from_issue(title, body_markdown),
        )
    }

    fn with_form(target: IssueTarget, form: IssueForm) -> Self {
        Self {
            target,
            form,
            phase: ModalPhase::Closed,
            errors: FieldErrors::default(),
            toast: None,
        }
    }

    pub fn open(&mut self) {
        self.phase = ModalPhase::Editing;
    }

    pub fn close(&mut self) {
        self.phase = ModalPhase::Closed;
    }

    pub fn is_open(&self) -> bool {
        self.phase != ModalPhase::Closed
    }

    pub fn phase(&self) -> ModalPhase {
        self.phase
    }

    pub fn form(&self) -> &IssueForm {
        &self.form
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn toast(&self) -> Option<&Toast> {
        self.toast.as_ref()
    }

    /// Replace the form contents with what the user typed.
    pub fn edit(&mut self, form: IssueForm) {
        self.form = form;
    }

    /// Validate, convert and send the form. `mutate` is the parent's refresh
    /// trigger and runs only when the write succeeded.
    pub async fn submit<A>(
        &mut self,
        api: &A,
        session: &Session,
        mutate: impl FnOnce(),
    ) -> SubmitOutcome
    where
        A: IssueApi + ?Sized,
    {
        if let Err(errors) = self.form.validate() {
            self.errors = errors;
            return SubmitOutcome::Invalid;
        }
        self.errors = FieldErrors::default();

        let payload = self.form.to_payload();
        self.phase = ModalPhase::Submitting;
        self.toast = Some(self.target.progress_toast());

        let token = session.access_token.as_str();
        let result = match &self.target {
            IssueTarget::New(repo) => api.create_issue(token, repo, &payload).await,
            IssueTarget::Existing(params) => api.update_issue(token, params, &payload).await,
        };

        self.phase = ModalPhase::Editing;
        self.toast = None;

        match result {
            Ok(status) if status == self.target.success_status() => {
                info!(action = %self.target.action(), "issue saved");
                self.toast = Some(self.target.success_toast());
                mutate();
                self.close();
                SubmitOutcome::Saved
            }
            Ok(status) => {
                warn!(status = status.as_u16(), "issue write returned unexpected status");
                SubmitOutcome::Unacknowledged(status)
            }
            Err(err) => {
                error!(error = %err, "issue submission failed");
                self.toast = Some(Toast::error("Oops...", "Something error"));
                SubmitOutcome::Failed
            }
        }
    }

    pub fn render(&self) -> Markup {
        let dialog_id = self.target.dialog_id();
        let (trigger, heading, description) = match self.target {
            IssueTarget::New(_) => (
                "New issue",
                "Post an Issue",
                "Create an issue here. Click save when you're done.",
            ),
            IssueTarget::Existing(_) => (
                "Edit",
                "Edit Issue",
                "Update the issue here. Click save when you're done.",
            ),
        };
        // Whatever the user typed is normalised through Markdown before it is
        // put back into the page.
        let editor_html = markdown::to_html(&markdown::to_markdown(&self.form.body));

        html! {
            button type="button" class="button modal-trigger"
                onclick=(format!("document.getElementById('{dialog_id}').showModal()")) {
                (trigger)
            }
            dialog id=(dialog_id) open[self.is_open()] {
                h2 { (heading) }
                p class="muted" { (description) }
                form method="post" action=(self.target.action()) data-issue-form {
                    label for=(format!("{dialog_id}-title")) { "Title" }
                    input id=(format!("{dialog_id}-title")) name="title" type="text"
                        placeholder="title" value=(self.form.title);
                    p class="hint" { "This is your title." }
                    @if let Some(message) = self.errors.title {
                        p class="field-error" { (message) }
                    }

                    label { "Body" }
                    div class="editor" contenteditable="true" data-editor {
                        (PreEscaped(editor_html.as_str()))
                    }
                    input type="hidden" name="body" value=(editor_html);
                    p class="hint" { "This is your body." }
                    @if let Some(message) = self.errors.body {
                        p class="field-error" { (message) }
                    }

                    div data-progress hidden[self.phase != ModalPhase::Submitting] {
                        (self.target.progress_toast().render())
                    }
                    button type="submit" class="button" { "Save changes" }
                }
                form method="dialog" {
                    button type="submit" class="button" { "Cancel" }
                }
            }
        }
    }
}
