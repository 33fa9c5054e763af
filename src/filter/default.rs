use super::FilterDocument;

const EXACT_MATCHES: &[&str] = &[
    "README",
    "README.md",
    "Cargo.toml",
    "Cargo.lock",
    "go.mod",
    "go.sum",
    "manifest.json",
    "filter.json",
];

const EXTENSION_MATCHES: &[&str] = &[".gitignore", ".env", ".log", ".tmp", ".bak", ".new"];

// Stock 3.3.5a client files that ship with the base install.
const BASE_MATCHES: &[&str] = &[
    "Battle.net.dll",
    "dbghelp.dll",
    "DivxDecoder.dll",
    "ijl15.dll",
    "msvcr80.dll",
    "Repair.exe",
    "Scan.dll",
    "unicows.dll",
    "WowError.exe",
    "Wow.exe",
    "WoW.exe",
    "Data/common-2.MPQ",
    "Data/common.MPQ",
    "Data/expansion.MPQ",
    "Data/lichking.MPQ",
    "Data/patch-2.MPQ",
    "Data/patch-3.MPQ",
    "Data/patch.MPQ",
    "Data/enUS/AccountBilling.url",
    "Data/enUS/backup-enUS.MPQ",
    "Data/enUS/base-enUS.MPQ",
    "Data/enUS/connection-help.html",
    "Data/enUS/Credits_BC.html",
    "Data/enUS/Credits.html",
    "Data/enUS/Credits_LK.html",
    "Data/enUS/eula.html",
    "Data/enUS/expansion-locale-enUS.MPQ",
    "Data/enUS/expansion-speech-enUS.MPQ",
    "Data/enUS/lichking-locale-enUS.MPQ",
    "Data/enUS/lichking-speech-enUS.MPQ",
    "Data/enUS/locale-enUS.MPQ",
    "Data/enUS/patch-enUS-2.MPQ",
    "Data/enUS/patch-enUS-3.MPQ",
    "Data/enUS/patch-enUS.MPQ",
    "Data/enUS/realmlist.wtf",
    "Data/enUS/speech-enUS.MPQ",
    "Data/enUS/TechSupport.url",
    "Data/enUS/tos.html",
];

const GLOB_PATTERNS: &[&str] = &[
    "patcher*",
    ".wine/*",
    ".git/*",
    "target/*",
    "temp/*",
    "docs/*.md",
    "Data/enUS/Interface/Cinematics/*.avi",
    "Data/enUS/Documentation/*",
    "Interface/AddOns/*",
    "WTF/*",
    "Cache/*",
    "Logs/*",
    "Errors/*",
    "Screenshots/*",
];

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| (*item).to_owned()).collect()
}

/// Ruleset used when no override document exists.
pub fn default_document() -> FilterDocument {
    FilterDocument {
        exact_matches: owned(EXACT_MATCHES),
        extension_matches: owned(EXTENSION_MATCHES),
        glob_patterns: owned(GLOB_PATTERNS),
        base_matches: owned(BASE_MATCHES),
        exclude_patterns: Vec::new(),
    }
}
