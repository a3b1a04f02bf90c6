//! Message catalog: role and tag lookup for notification text.
//!
//! Ships with a built-in English catalog; deployments override or
//! extend individual entries through `messages.catalog_overrides` in
//! the configuration. A missing tag yields nothing (no text appended),
//! never an error, so an exotic role simply goes without guidance.

use std::collections::BTreeMap;

/// Catalog tag for the abandon warning text.
pub const TAG_OFFICER_QUITTER: &str = "officer_quitter";
/// Catalog tag for the abandon-count label.
pub const TAG_NB_SQUADS_ABANDONED: &str = "nb_squads_abandoned";
/// Catalog tag for the support suggestion text.
pub const TAG_SUPPORT_NEEDED: &str = "support_needed";

/// An opaque `tag -> text` lookup for notification messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageCatalog {
    entries: BTreeMap<String, String>,
}

impl MessageCatalog {
    /// The built-in English catalog.
    pub fn builtin() -> Self {
        let entries = builtin_entries()
            .into_iter()
            .map(|(tag, text)| (tag.to_owned(), text.to_owned()))
            .collect();
        Self { entries }
    }

    /// The built-in catalog with deployment overrides merged on top.
    pub fn with_overrides(overrides: &BTreeMap<String, String>) -> Self {
        let mut catalog = Self::builtin();
        for (tag, text) in overrides {
            catalog.entries.insert(tag.clone(), text.clone());
        }
        catalog
    }

    /// Look up the text for a tag.
    pub fn get(&self, tag: &str) -> Option<&str> {
        self.entries.get(tag).map(String::as_str)
    }
}

/// Built-in English texts, one entry per role or message tag.
fn builtin_entries() -> Vec<(&'static str, &'static str)> {
    vec![
        (
            TAG_OFFICER_QUITTER,
            "You have left your officer role,\nabandoning your men.\nThis behavior is unacceptable.\nAdmins have been alerted.\n----------\n",
        ),
        (TAG_NB_SQUADS_ABANDONED, "Squads abandoned"),
        (
            TAG_SUPPORT_NEEDED,
            "Your team is short on supports.\nConsider switching to\n- Support -\nso garrisons can be built.\n----------\n",
        ),
        (
            "armycommander",
            "You chose to play\n- Commander -\n----------\nYou MUST communicate via voice chat.\nIf you can't or won't: give up your spot!\n----------\nAsk officers to place garrisons and engineers to build nodes as soon as possible.",
        ),
        (
            "officer",
            "You chose to play\n- Squad Leader (SL) -\n----------\nYou MUST communicate via voice chat.\nIf you can't or won't: give up your spot!\n----------\nPlace garrisons 200m from objectives and your OP 100m away.\nInform the commander of your actions and follow orders.",
        ),
        (
            "antitank",
            "You chose to play\n- Anti-tank -\nRemember, the weak spot of armored vehicles is at the rear.",
        ),
        (
            "automaticrifleman",
            "You chose to play\n- Automatic Rifleman -\nSecure your comrades' advance.\nProtect the SL, the support, garrisons, and OPs.",
        ),
        (
            "assault",
            "You chose to play\n- Assault -\nIt's your job to lead the charge.\nInform your officer about enemies you encounter.",
        ),
        (
            "heavymachinegunner",
            "You chose to play\n- Heavy Machine Gunner -\nPosition yourself in the rear or on high ground to cover your teammates.",
        ),
        (
            "support",
            "You chose to play\n- Support -\nHelp the SL move forward and drop your supply crate when a garrison can be built.",
        ),
        (
            "sniper",
            "You chose to play\n- Sniper -\nSneak into enemy lines,\neliminate priority targets,\ndestroy nodes,\nand report what you see to your SL.",
        ),
        (
            "spotter",
            "You chose to play\n- Recon SL -\n----------\nYou MUST communicate via voice chat.\nIf you can't or won't: give up your spot!\n----------\nSneak into enemy lines,\neliminate priority targets,\ndestroy nodes,\nand report to the commander what you see.",
        ),
        (
            "rifleman",
            "You chose to play\n- Rifleman -\nIt's an ideal role for beginners.\nPick a different one when you feel ready to take on more responsibility.",
        ),
        (
            "crewman",
            "You chose to play\n- Tank Crew -\nA tank crew is always more effective when communicating.\nInform your tank commander of what you see.",
        ),
        (
            "tankcommander",
            "You chose to play\n- Tank Commander -\n----------\nYou MUST communicate via voice chat.\nIf you can't or won't: give up your spot!\n----------\nA tank crew is always more effective when communicating.\nInform your commander of what you see.",
        ),
        (
            "engineer",
            "You chose to play\n- Engineer -\nYour main mission is to ensure the commander has nodes.\nYou can also fortify points and repair tanks.",
        ),
        (
            "medic",
            "You chose to play\n- Medic -\nStay in the rear and heal the wounded.\nAnnounce yourself using proximity voice chat so they don't redeploy before you arrive.",
        ),
    ]
}
