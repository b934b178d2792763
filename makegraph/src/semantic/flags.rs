// SPDX-License-Identifier: GPL-3.0-or-later

//! Static classification of the GCC/Clang compiler flags.
//!
//! The table answers one question: does the flag consume the next token of
//! the command line as its argument? It is used to validate the compiler
//! invocations. A flag which is not in the table is reported, because that
//! means the table needs to be extended, not that the trace is wrong.
//!
//! The lookup works on the flag without its leading dashes:
//! 1. exact match against the flags without argument,
//! 2. `name=value` where `name` is a flag with a glued value,
//! 3. anything starting with `W` (warnings, `-Wl,` and `-Wa,` pass-through),
//! 4. prefix match against the flags with argument. The exact match consumes
//!    the next token, a longer token has the argument glued to it.
//! 5. anything else of the `-f`, `-g` and `-Q` families. None of these take
//!    a separate argument.

/// Flag families which never consume the next token.
const NO_ARG_FAMILIES: [char; 3] = ['f', 'g', 'Q'];

use std::collections::HashSet;
use std::sync::LazyLock;

/// The result of the flag classification.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FlagClass {
    /// The next token is the argument of this flag (`-I include`).
    ConsumesNextArg,
    /// The flag stands alone (`-c`, `-std=c++11`, `-Iinclude`).
    Standalone,
    /// The flag is not known.
    Unknown,
}

/// Removes the leading dashes of a flag.
pub fn strip_dashes(token: &str) -> &str {
    token.trim_start_matches('-')
}

/// Classify a single token of a compiler command line.
///
/// Tokens without a leading dash are not flags, those are `Unknown`.
pub fn classify_flag(token: &str) -> FlagClass {
    if !token.starts_with('-') {
        return FlagClass::Unknown;
    }
    let flag = strip_dashes(token);
    if flag.is_empty() {
        return FlagClass::Unknown;
    }
    if NO_ARG_FLAGS.contains(flag) {
        return FlagClass::Standalone;
    }
    if let Some((name, _)) = flag.split_once('=') {
        if VALUED_FLAGS.contains(name) {
            return FlagClass::Standalone;
        }
    }
    if flag.starts_with('W') {
        return FlagClass::Standalone;
    }
    for candidate in ONE_ARG_FLAGS.iter() {
        if flag == *candidate {
            return FlagClass::ConsumesNextArg;
        }
        if flag.starts_with(candidate) {
            return FlagClass::Standalone;
        }
    }
    if flag.starts_with(NO_ARG_FAMILIES) {
        return FlagClass::Standalone;
    }
    FlagClass::Unknown
}

/// Flags which take an argument, either as the next token or glued.
///
/// Sorted by length in descending order, so the longest prefix wins.
static ONE_ARG_FLAGS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    let mut flags = vec![
        // output
        "o",
        // preprocessor
        "I", "D", "U", "include", "imacros", "isystem", "iquote", "idirafter",
        "iprefix", "iwithprefix", "iwithprefixbefore", "isysroot", "MF", "MT", "MQ",
        // language and target selection
        "x", "target", "gcc-toolchain", "sysroot", "arch", "param", "mllvm",
        // pass-through to the sub-tools
        "Xclang", "Xassembler", "Xpreprocessor", "Xlinker",
        // linker search path
        "L",
    ];
    flags.sort_by(|a, b| b.len().cmp(&a.len()));
    flags
});

/// Flags which take their value after an `=` sign.
#[rustfmt::skip]
static VALUED_FLAGS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    HashSet::from([
        "std", "stdlib", "rtlib", "unwindlib",
        "march", "mtune", "mcpu", "mfpu", "mfloat-abi", "mabi", "mstack-alignment",
        "mbranch-protection", "mmacosx-version-min", "miphoneos-version-min",
        "fvisibility", "fsanitize", "fno-sanitize", "fsanitize-recover",
        "fno-sanitize-recover", "fsanitize-trap", "fsanitize-blacklist", "fsanitize-ignorelist",
        "fdebug-prefix-map", "ffile-prefix-map", "fmacro-prefix-map", "fdebug-compilation-dir",
        "fmessage-length", "finline-limit", "ftemplate-depth", "fconstexpr-depth",
        "fconstexpr-steps", "flto", "fprofile-instr-use", "fprofile-use", "fprofile-generate",
        "fprofile-sample-use", "ffp-contract", "ffp-model", "fuse-ld", "fdiagnostics-color",
        "fdiagnostics-format", "fexcess-precision", "fcf-protection", "fopenmp",
        "fembed-bitcode", "fdebug-default-version",
    ])
});

/// Flags which do not take an argument.
#[rustfmt::skip]
static NO_ARG_FLAGS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    HashSet::from([
        // stop after a given stage
        "c", "S", "E",
        // dependency file generation
        "M", "MM", "MD", "MMD", "MP", "MG",
        // preprocessor
        "P", "C", "CC", "H", "undef", "trigraphs", "nostdinc", "nostdinc++",
        // diagnostics
        "v", "w", "pedantic", "pedantic-errors",
        // debug information
        "g", "g0", "g1", "g2", "g3", "ggdb", "gdwarf", "gdwarf-2", "gdwarf-3", "gdwarf-4",
        "gdwarf-5", "gline-tables-only", "gsplit-dwarf", "gcolumn-info", "gno-column-info",
        // optimization
        "O", "O0", "O1", "O2", "O3", "Os", "Oz", "Og", "Ofast",
        // driver
        "pipe", "ansi", "pthread", "shared", "static", "nostdlib", "nodefaultlibs",
        "nostartfiles", "no-canonical-prefixes", "rdynamic", "s", "save-temps",
        // code generation
        "fpic", "fPIC", "fpie", "fPIE", "fno-pic", "fno-PIC", "fno-pie", "fno-PIE",
        "fexceptions", "fno-exceptions", "frtti", "fno-rtti",
        "ffunction-sections", "fno-function-sections", "fdata-sections", "fno-data-sections",
        "fstack-protector", "fstack-protector-strong", "fstack-protector-all",
        "fno-stack-protector", "fomit-frame-pointer", "fno-omit-frame-pointer",
        "fstrict-aliasing", "fno-strict-aliasing", "fstrict-overflow", "fno-strict-overflow",
        "funwind-tables", "fno-unwind-tables", "fasynchronous-unwind-tables",
        "fno-asynchronous-unwind-tables", "fsigned-char", "funsigned-char",
        "fshort-enums", "fno-short-enums", "fshort-wchar", "fno-short-wchar",
        "fintegrated-as", "fno-integrated-as", "fvisibility-inlines-hidden",
        "fbuiltin", "fno-builtin", "fcommon", "fno-common", "fpermissive",
        "fms-extensions", "fopenmp", "faddrsig", "fno-addrsig", "femulated-tls",
        "fno-emulated-tls", "fjump-tables", "fno-jump-tables", "fthreadsafe-statics",
        "fno-threadsafe-statics", "fmath-errno", "fno-math-errno", "ffast-math",
        "fno-fast-math", "fuse-cxa-atexit", "fno-use-cxa-atexit", "finline-functions",
        "fno-inline-functions", "fno-inline", "fmodules", "fno-modules", "fcxx-modules",
        "fobjc-arc", "fno-objc-arc", "fblocks", "ftrapv", "fwrapv", "flto", "fno-lto",
        "fmerge-all-constants", "fno-merge-all-constants", "fdeclspec",
        "fno-delete-null-pointer-checks", "fdata-sections", "fno-limit-debug-info",
        "fstandalone-debug", "fno-standalone-debug", "fprofile-arcs", "ftest-coverage",
        "fcoverage-mapping", "fprofile-instr-generate", "fsanitize-minimal-runtime",
        // diagnostics formatting
        "fcolor-diagnostics", "fno-color-diagnostics", "fdiagnostics-show-option",
        "fno-diagnostics-show-option", "fno-caret-diagnostics",
        // machine
        "marm", "mthumb", "mno-thumb", "mhard-float", "msoft-float",
        "mno-unaligned-access", "munaligned-access", "mstackrealign",
        "m32", "m64", "msse", "msse2", "msse3", "mssse3", "msse4.1", "msse4.2",
        "mavx", "mavx2", "mpopcnt", "mwindows", "mconsole",
    ])
});
