use crate::state::{Sender, UserProfile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    English,
    Portuguese,
}

/// Localized strings used by the chat session.
#[derive(Debug, Clone, Copy)]
pub struct Strings {
    pub user_label: &'static str,
    pub assistant_label: &'static str,
    pub fill_all_fields: &'static str,
    pub invalid_birth_date: &'static str,
    pub default_welcome: &'static str,
    pub fallback_welcome: &'static str,
    pub error_message: &'static str,
    pub processing_error: &'static str,
    pub type_placeholder: &'static str,
    pub typing: &'static str,
    pub form_title: &'static str,
    pub name_label: &'static str,
    pub birth_date_label: &'static str,
    pub phone_label: &'static str,
    pub email_label: &'static str,
    pub reset_confirm: &'static str,
}

const PT: Strings = Strings {
    user_label: "Usuário",
    assistant_label: "Assistente",
    fill_all_fields: "Por favor, preencha todos os campos.",
    invalid_birth_date: "Data de nascimento inválida. Use o formato AAAA-MM-DD.",
    default_welcome: "Olá! Vou te ajudar a encontrar o personal trainer perfeito para você!",
    fallback_welcome: "Olá! Vou te ajudar a encontrar o personal trainer perfeito para você! Vamos começar nossa conversa.",
    error_message: "Desculpe, ocorreu um erro. Tente novamente em alguns instantes.",
    processing_error: "Desculpe, não consegui processar sua mensagem.",
    type_placeholder: "Digite sua mensagem...",
    typing: "Digitando",
    form_title: "Antes de começar, conte um pouco sobre você",
    name_label: "Nome",
    birth_date_label: "Data de nascimento (AAAA-MM-DD)",
    phone_label: "Telefone",
    email_label: "E-mail",
    reset_confirm: "Apagar a conversa e começar de novo? (s/n)",
};

const EN: Strings = Strings {
    user_label: "User",
    assistant_label: "Assistant",
    fill_all_fields: "Please fill in all fields.",
    invalid_birth_date: "Invalid date of birth. Use the YYYY-MM-DD format.",
    default_welcome: "Hello! I will help you find the perfect personal trainer for you!",
    fallback_welcome: "Hello! I will help you find the perfect personal trainer for you! Let's start our conversation.",
    error_message: "Sorry, an error occurred. Please try again in a few moments.",
    processing_error: "Sorry, I couldn't process your message.",
    type_placeholder: "Type your message...",
    typing: "Typing",
    form_title: "Before we start, tell us a little about yourself",
    name_label: "Name",
    birth_date_label: "Date of birth (YYYY-MM-DD)",
    phone_label: "Phone",
    email_label: "Email",
    reset_confirm: "Clear the conversation and start over? (y/n)",
};

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Portuguese => "pt",
            Language::English => "en",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pt" | "pt-br" | "portuguese" => Some(Language::Portuguese),
            "en" | "en-us" | "english" => Some(Language::English),
            _ => None,
        }
    }

    pub fn all() -> Vec<Language> {
        vec![Language::English, Language::Portuguese]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Language::Portuguese => "Português",
            Language::English => "English",
        }
    }

    pub fn strings(&self) -> &'static Strings {
        match self {
            Language::Portuguese => &PT,
            Language::English => &EN,
        }
    }

    pub fn label(&self, sender: Sender) -> &'static str {
        match sender {
            Sender::User => self.strings().user_label,
            Sender::Assistant => self.strings().assistant_label,
        }
    }

    /// Answer to a yes/no prompt.
    pub fn is_yes(&self, c: char) -> bool {
        match self {
            Language::Portuguese => matches!(c, 's' | 'S' | 'y' | 'Y'),
            Language::English => matches!(c, 'y' | 'Y'),
        }
    }

    /// First message sent on behalf of the user once the intake form is filled.
    pub fn intake_message(&self, profile: &UserProfile, age: i32) -> String {
        match self {
            Language::English => format!(
                "Hello! My name is {}, I am {} years old. My phone is {} and my email is {}. \
                 I am looking for a personal trainer who can help me achieve my fitness goals \
                 and transform my life through exercise. Can you help me find the ideal \
                 professional for me?",
                profile.name, age, profile.phone, profile.email
            ),
            Language::Portuguese => format!(
                "Olá! Meu nome é {}, tenho {} anos. Meu telefone é {} e meu email é {}. \
                 Estou procurando um personal trainer que me ajude a alcançar meus objetivos \
                 de fitness e transformar minha vida através do exercício. Pode me ajudar a \
                 encontrar o profissional ideal para mim?",
                profile.name, age, profile.phone, profile.email
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_language_codes() {
        assert_eq!(Language::from_str("EN"), Some(Language::English));
        assert_eq!(Language::from_str("pt-BR"), Some(Language::Portuguese));
        assert_eq!(Language::from_str("fr"), None);
    }

    #[test]
    fn every_language_round_trips_its_code() {
        for language in Language::all() {
            assert_eq!(Language::from_str(language.as_str()), Some(language));
            assert!(!language.display_name().is_empty());
        }
        assert_eq!(Language::all()[0], Language::default());
    }

    #[test]
    fn labels_follow_language() {
        assert_eq!(Language::Portuguese.label(Sender::User), "Usuário");
        assert_eq!(Language::English.label(Sender::Assistant), "Assistant");
    }

    #[test]
    fn yes_follows_language() {
        assert!(Language::Portuguese.is_yes('s'));
        assert!(Language::English.is_yes('Y'));
        assert!(!Language::English.is_yes('s'));
    }

    #[test]
    fn intake_message_embeds_profile_and_age() {
        let profile = UserProfile {
            name: "Bruno".into(),
            birth_date: "1995-01-01".into(),
            phone: "555-0100".into(),
            email: "bruno@example.com".into(),
        };
        let msg = Language::English.intake_message(&profile, 30);
        assert!(msg.starts_with("Hello! My name is Bruno, I am 30 years old."));
        assert!(msg.contains("555-0100"));
        assert!(msg.contains("bruno@example.com"));

        let msg = Language::Portuguese.intake_message(&profile, 30);
        assert!(msg.starts_with("Olá! Meu nome é Bruno, tenho 30 anos."));
    }
}
