//! Reply languages and the canned sentences shown when a service fails.

use serde::Serialize;

/// Languages the assistant answers in, identified by two-letter codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Language {
    Kannada,
    Hindi,
    English,
    Telugu,
    Malayalam,
    Tamil,
}

impl Language {
    pub const ALL: [Language; 6] = [
        Language::Kannada,
        Language::Hindi,
        Language::English,
        Language::Telugu,
        Language::Malayalam,
        Language::Tamil,
    ];

    /// Parses a two-letter code; anything unrecognised is English.
    pub fn from_code(code: &str) -> Language {
        match code.trim().to_ascii_lowercase().as_str() {
            "kn" => Language::Kannada,
            "hi" => Language::Hindi,
            "te" => Language::Telugu,
            "ml" => Language::Malayalam,
            "ta" => Language::Tamil,
            _ => Language::English,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Language::Kannada => "kn",
            Language::Hindi => "hi",
            Language::English => "en",
            Language::Telugu => "te",
            Language::Malayalam => "ml",
            Language::Tamil => "ta",
        }
    }

    /// Reply used when no chat-completion credential is configured.
    pub fn service_unavailable(self) -> &'static str {
        match self {
            Language::Kannada => {
                "AI ಸೇವೆಯನ್ನು ಈಗ ಬಳಸಲು ಆಗುತ್ತಿಲ್ಲ. ದಯವಿಟ್ಟು ನಿರ್ವಾಹಕರನ್ನು ಸಂಪರ್ಕಿಸಿ."
            }
            Language::Hindi => "AI सेवा अभी उपलब्ध नहीं है। कृपया व्यवस्थापक से संपर्क करें।",
            _ => "AI service is not configured. Please contact the administrator.",
        }
    }

    /// Reply used when the chat-completion endpoint answers with a non-200 status.
    pub fn upstream_failure(self) -> &'static str {
        match self {
            Language::Kannada => {
                "ಕ್ಷಮಿಸಿ, ಸೇವೆಯೊಂದಿಗೆ ಸಂಪರ್ಕ ಸಾಧಿಸಲು ಸಾಧ್ಯವಾಗುತ್ತಿಲ್ಲ. ದಯವಿಟ್ಟು ಕೆಲವು ನಿಮಿಷಗಳ ನಂತರ ಮತ್ತೆ ಪ್ರಯತ್ನಿಸಿ."
            }
            Language::Hindi => {
                "क्षमा करें, सेवा से कनेक्ट नहीं हो पा रहा है। कृपया कुछ मिनटों बाद पुनः प्रयास करें।"
            }
            _ => "Sorry, unable to connect to the service. Please try again after some time.",
        }
    }

    /// Reply used when the request never produced a usable response.
    pub fn network_failure(self) -> &'static str {
        match self {
            Language::Kannada => "ನೆಟ್ವರ್ಕ್ ದೋಷ ಸಂಭವಿಸಿದೆ. ದಯವಿಟ್ಟು ಮತ್ತೆ ಪ್ರಯತ್ನಿಸಿ.",
            Language::Hindi => "नेटवर्क त्रुटि हुई। कृपया पुनः प्रयास करें।",
            _ => "Network error occurred. Please try again.",
        }
    }

    /// Reply used when the model returned an empty completion.
    pub fn no_answer(self) -> &'static str {
        match self {
            Language::Kannada => "ಕ್ಷಮಿಸಿ, ಉತ್ತರ ಸಿಗಲಿಲ್ಲ.",
            Language::Hindi => "क्षमा करें, उत्तर नहीं मिला।",
            _ => "Sorry, no answer was found.",
        }
    }
}
