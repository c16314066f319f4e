// Form Widgets
//
// Minimal keyboard forms: text inputs, option selectors and buttons.
// Buttons hand their action back to the app instead of running it.
//

use super::app::Action;
use crossterm::event::{KeyCode, KeyEvent};

#[derive(Debug, Clone)]
pub enum FieldKind {
    Text { value: String, masked: bool },
    Select { options: Vec<String>, index: usize },
    Button(Action),
}

#[derive(Debug, Clone)]
pub struct Field {
    pub id: &'static str,
    pub label: String,
    pub kind: FieldKind,
}

/// What a key press did to the form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormResponse {
    Consumed,
    Submit(Action),
    Leave,
    Ignored,
}

#[derive(Debug, Clone)]
pub struct Form {
    pub title: String,
    pub fields: Vec<Field>,
    pub focus: usize,
}

impl Form {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            fields: Vec::new(),
            focus: 0,
        }
    }

    pub fn text(mut self, id: &'static str, label: &str, value: &str) -> Self {
        self.fields.push(Field {
            id,
            label: label.to_string(),
            kind: FieldKind::Text {
                value: value.to_string(),
                masked: false,
            },
        });
        self
    }

    pub fn password(mut self, id: &'static str, label: &str) -> Self {
        self.fields.push(Field {
            id,
            label: label.to_string(),
            kind: FieldKind::Text {
                value: String::new(),
                masked: true,
            },
        });
        self
    }

    pub fn select<S: ToString>(mut self, id: &'static str, label: &str, options: &[S], index: usize) -> Self {
        let options: Vec<String> = options.iter().map(ToString::to_string).collect();
        let index = index.min(options.len().saturating_sub(1));
        self.fields.push(Field {
            id,
            label: label.to_string(),
            kind: FieldKind::Select { options, index },
        });
        self
    }

    pub fn button(mut self, label: &str, action: Action) -> Self {
        self.fields.push(Field {
            id: "",
            label: label.to_string(),
            kind: FieldKind::Button(action),
        });
        self
    }

    fn field(&self, id: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.id == id)
    }

    fn field_mut(&mut self, id: &str) -> Option<&mut Field> {
        self.fields.iter_mut().find(|f| f.id == id)
    }

    /// Current text of a text field, or the chosen option of a selector
    pub fn value(&self, id: &str) -> &str {
        match self.field(id).map(|f| &f.kind) {
            Some(FieldKind::Text { value, .. }) => value.as_str(),
            Some(FieldKind::Select { options, index }) => {
                options.get(*index).map(String::as_str).unwrap_or("")
            }
            _ => "",
        }
    }

    pub fn set_text(&mut self, id: &str, text: &str) {
        if let Some(Field {
            kind: FieldKind::Text { value, .. },
            ..
        }) = self.field_mut(id)
        {
            *value = text.to_string();
        }
    }

    pub fn clear(&mut self, id: &str) {
        self.set_text(id, "");
    }

    /// True when typed characters go into a text field
    pub fn editing_text(&self) -> bool {
        matches!(
            self.fields.get(self.focus).map(|f| &f.kind),
            Some(FieldKind::Text { .. })
        )
    }

    fn move_focus(&mut self, forward: bool) {
        if self.fields.is_empty() {
            return;
        }
        let len = self.fields.len();
        self.focus = if forward {
            (self.focus + 1) % len
        } else {
            (self.focus + len - 1) % len
        };
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> FormResponse {
        match key.code {
            KeyCode::Esc => return FormResponse::Leave,
            KeyCode::Tab | KeyCode::Down => {
                self.move_focus(true);
                return FormResponse::Consumed;
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.move_focus(false);
                return FormResponse::Consumed;
            }
            KeyCode::Enter if self.editing_text() => {
                self.move_focus(true);
                return FormResponse::Consumed;
            }
            _ => {}
        }

        let Some(field) = self.fields.get_mut(self.focus) else {
            return FormResponse::Ignored;
        };

        match (&mut field.kind, key.code) {
            (FieldKind::Text { value, .. }, KeyCode::Char(c)) => {
                value.push(c);
                FormResponse::Consumed
            }
            (FieldKind::Text { value, .. }, KeyCode::Backspace) => {
                value.pop();
                FormResponse::Consumed
            }
            (FieldKind::Select { options, index }, KeyCode::Right | KeyCode::Enter) => {
                if !options.is_empty() {
                    *index = (*index + 1) % options.len();
                }
                FormResponse::Consumed
            }
            (FieldKind::Select { options, index }, KeyCode::Left) => {
                if !options.is_empty() {
                    *index = (*index + options.len() - 1) % options.len();
                }
                FormResponse::Consumed
            }
            (FieldKind::Button(action), KeyCode::Enter | KeyCode::Char(' ')) => {
                FormResponse::Submit(*action)
            }
            _ => FormResponse::Ignored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn form() -> Form {
        Form::new("Test")
            .text("worker", "Worker Name", "xoon")
            .select("port", "Port", &[3333u16, 443, 80], 0)
            .button("Start Mining", Action::Logout)
    }

    #[test]
    fn test_text_editing() {
        let mut form = form();
        assert!(form.editing_text());
        form.handle_key(key(KeyCode::Backspace));
        form.handle_key(key(KeyCode::Char('N')));
        assert_eq!(form.value("worker"), "xooN");
    }

    #[test]
    fn test_select_cycles_both_ways() {
        let mut form = form();
        form.handle_key(key(KeyCode::Tab));
        assert!(!form.editing_text());
        assert_eq!(form.value("port"), "3333");

        form.handle_key(key(KeyCode::Left));
        assert_eq!(form.value("port"), "80");
        form.handle_key(key(KeyCode::Right));
        form.handle_key(key(KeyCode::Right));
        assert_eq!(form.value("port"), "443");
    }

    #[test]
    fn test_button_submits_and_esc_leaves() {
        let mut form = form();
        form.handle_key(key(KeyCode::BackTab));
        assert_eq!(form.handle_key(key(KeyCode::Enter)), FormResponse::Submit(Action::Logout));
        assert_eq!(form.handle_key(key(KeyCode::Esc)), FormResponse::Leave);
    }

    #[test]
    fn test_clear_password() {
        let mut form = Form::new("Wallet").password("pw", "Password");
        form.handle_key(key(KeyCode::Char('s')));
        assert_eq!(form.value("pw"), "s");
        form.clear("pw");
        assert_eq!(form.value("pw"), "");
        assert_eq!(form.value("missing"), "");
    }
}
