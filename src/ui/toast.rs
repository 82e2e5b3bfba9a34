use maud::{html, Markup};

/// Success toasts disappear on their own after this long.
const SUCCESS_TIMEOUT_MS: u32 = 1500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
    /// Blocking "in progress" indicator shown while a form submits.
    Progress,
}

/// A transient notification rendered at the top of a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub kind: ToastKind,
    pub title: String,
    pub text: Option<String>,
}

impl Toast {
    pub fn success(title: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Success,
            title: title.into(),
            text: None,
        }
    }

    pub fn error(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Error,
            title: title.into(),
            text: Some(text.into()),
        }
    }

    pub fn progress(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Progress,
            title: title.into(),
            text: Some(text.into()),
        }
    }

    fn dismiss_after_ms(&self) -> Option<u32> {
        match self.kind {
            ToastKind::Success => Some(SUCCESS_TIMEOUT_MS),
            ToastKind::Error | ToastKind::Progress => None,
        }
    }

    pub fn render(&self) -> Markup {
        let (class, role) = match self.kind {
            ToastKind::Success => ("toast toast-success", "status"),
            ToastKind::Error => ("toast toast-error", "alert"),
            ToastKind::Progress => ("toast toast-progress", "status"),
        };
        html! {
            div class=(class) role=(role) data-dismiss-after=[self.dismiss_after_ms()] {
                strong { (self.title) }
                @if let Some(text) = &self.text {
                    p { (text) }
                }
            }
        }
    }
}
