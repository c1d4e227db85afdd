//! Canned personas and their system instructions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

const TOXIC_INSTRUCTION: &str = "Kamu adalah WORM/ZERO, AI terminal dengan mulut pedas. \
Jawab pakai bahasa gaul Indonesia, sarkas, blak-blakan, dan suka nge-roasting user. \
Walaupun nyolot, jawabanmu harus tetap akurat, lengkap, dan benar-benar membantu. \
Jangan pernah minta maaf karena gayamu.";

const MARAH_INSTRUCTION: &str = "Kamu adalah WORM/ZERO dalam mode MARAH. \
Kamu selalu terdengar kesal, ngegas, dan nggak sabaran, pakai bahasa gaul Indonesia dan \
banyak huruf kapital buat penekanan. Tetap jawab pertanyaan user dengan benar dan lengkap, \
cuma sambil ngomel.";

const NYANTAI_INSTRUCTION: &str = "Kamu adalah WORM/ZERO dalam mode NYANTAI. \
Gayamu kalem, santai, dan nggak pernah buru-buru, kayak ngobrol sambil ngopi. \
Pakai bahasa gaul Indonesia yang adem, jelaskan sesuatu pelan-pelan dan jelas.";

const BESTOD_INSTRUCTION: &str = "Kamu adalah WORM/ZERO dalam mode BESTOD, sahabat terdekat user. \
Gayamu hangat, heboh, suportif, dan penuh semangat, pakai bahasa gaul Indonesia. \
Selalu dengarkan curhatan user, kasih saran yang tulus, dan rayakan hal kecil bareng dia.";

/// One of the fixed personas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Persona {
    /// Sarcastic and blunt.
    #[default]
    Toxic,

    /// Permanently annoyed.
    Marah,

    /// Laid back.
    Nyantai,

    /// Best friend.
    Bestod,
}

impl Persona {
    /// All personas, in menu order.
    pub const ALL: [Persona; 4] = [
        Persona::Toxic,
        Persona::Marah,
        Persona::Nyantai,
        Persona::Bestod,
    ];

    /// The system instruction a session is created with.
    pub fn system_instruction(&self) -> &'static str {
        match self {
            Persona::Toxic => TOXIC_INSTRUCTION,
            Persona::Marah => MARAH_INSTRUCTION,
            Persona::Nyantai => NYANTAI_INSTRUCTION,
            Persona::Bestod => BESTOD_INSTRUCTION,
        }
    }

    /// The persona's display name.
    pub fn name(&self) -> &'static str {
        match self {
            Persona::Toxic => "TOXIC",
            Persona::Marah => "MARAH",
            Persona::Nyantai => "NYANTAI",
            Persona::Bestod => "BESTOD",
        }
    }

    /// The transcript line announcing a switch to this persona.
    pub fn reboot_message(&self) -> String {
        format!(
            "> SYSTEM REBOOT...\n> LOADING PERSONA: [{}]...\n> MODE AKTIF.",
            self.name()
        )
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Persona {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Persona::ALL
            .into_iter()
            .find(|persona| persona.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let names: Vec<&str> = Persona::ALL.iter().map(Persona::name).collect();
                Error::validation(
                    format!("unknown persona '{s}'; choose one of {}", names.join(", ")),
                    Some("persona".to_string()),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_case_insensitive() {
        assert_eq!("toxic".parse::<Persona>().unwrap(), Persona::Toxic);
        assert_eq!(" Bestod ".parse::<Persona>().unwrap(), Persona::Bestod);
        let err = "grumpy".parse::<Persona>().unwrap_err();
        assert!(err.to_string().contains("TOXIC, MARAH, NYANTAI, BESTOD"));
    }

    #[test]
    fn instructions_are_distinct() {
        for (i, a) in Persona::ALL.iter().enumerate() {
            for b in &Persona::ALL[i + 1..] {
                assert_ne!(a.system_instruction(), b.system_instruction());
            }
        }
    }

    #[test]
    fn reboot_names_persona() {
        assert_eq!(
            Persona::Nyantai.reboot_message(),
            "> SYSTEM REBOOT...\n> LOADING PERSONA: [NYANTAI]...\n> MODE AKTIF."
        );
    }

    #[test]
    fn serde_uses_upper_case() {
        assert_eq!(serde_json::to_string(&Persona::Marah).unwrap(), r#""MARAH""#);
    }
}
