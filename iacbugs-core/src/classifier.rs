//! Path-based classification of changed files into unit categories.
//!
//! Each ecosystem owns an ordered rule table. Rules are evaluated top to bottom
//! and the first match decides the category; a matching rule whose category is
//! [`Category::Unclassified`] marks a file that is known to be irrelevant
//! (documentation, changelogs, repository metadata). Paths that fall through
//! every rule are also unclassified, but are reported with a warning so the
//! tables can be refined.

use log::warn;

use crate::domain::{Category, Ecosystem};
use crate::error::Result;

/// A predicate over a repository-relative path.
#[derive(Debug)]
pub enum Matcher {
    /// The path contains any of the substrings.
    Contains(&'static [&'static str]),
    /// The path ends with any of the suffixes.
    EndsWith(&'static [&'static str]),
    /// The path starts with any of the prefixes.
    StartsWith(&'static [&'static str]),
    /// The path has no `/`, i.e. it sits at the repository root.
    NoSeparator,
    /// At least one nested matcher holds.
    AnyOf(&'static [Matcher]),
    /// Every nested matcher holds.
    AllOf(&'static [Matcher]),
    /// The nested matcher does not hold.
    Not(&'static Matcher),
}

impl Matcher {
    /// Evaluate the matcher against a path.
    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Contains(needles) => needles.iter().any(|needle| path.contains(needle)),
            Self::EndsWith(suffixes) => suffixes.iter().any(|suffix| path.ends_with(suffix)),
            Self::StartsWith(prefixes) => prefixes.iter().any(|prefix| path.starts_with(prefix)),
            Self::NoSeparator => !path.contains('/'),
            Self::AnyOf(matchers) => matchers.iter().any(|matcher| matcher.matches(path)),
            Self::AllOf(matchers) => matchers.iter().all(|matcher| matcher.matches(path)),
            Self::Not(matcher) => !matcher.matches(path),
        }
    }
}

/// A single `(predicate, category)` entry of a rule table.
#[derive(Debug)]
pub struct Rule {
    /// Predicate deciding whether the rule applies.
    pub matcher: Matcher,
    /// Category assigned on match.
    pub category: Category,
}

/// Result of running a path through a rule table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A rule matched; `index` is its zero-based position in the table.
    Matched {
        /// Position of the winning rule.
        index: usize,
        /// Category assigned by the rule.
        category: Category,
    },
    /// No rule matched.
    Unhandled,
}

impl Outcome {
    /// Category implied by the outcome.
    pub fn category(&self) -> Category {
        match self {
            Self::Matched { category, .. } => *category,
            Self::Unhandled => Category::Unclassified,
        }
    }

    /// Index of the winning rule, if any.
    pub fn rule(&self) -> Option<usize> {
        match self {
            Self::Matched { index, .. } => Some(*index),
            Self::Unhandled => None,
        }
    }
}

const IGNORED_SUFFIXES: &[&str] = &[".md", ".bugfix", ".rst"];

static ANSIBLE_RULES: &[Rule] = &[
    Rule {
        matcher: Matcher::Contains(&["test/", "tests/", "molecule"]),
        category: Category::TestUnit,
    },
    Rule {
        matcher: Matcher::AnyOf(&[
            Matcher::Contains(&["changelog", "doc/", "docs/"]),
            Matcher::EndsWith(IGNORED_SUFFIXES),
        ]),
        category: Category::Unclassified,
    },
    Rule {
        matcher: Matcher::AnyOf(&[Matcher::Contains(&["modules"]), Matcher::EndsWith(&[".py"])]),
        category: Category::ConfigUnit,
    },
    Rule {
        matcher: Matcher::Contains(&["templates/"]),
        category: Category::TemplateUnit,
    },
    Rule {
        matcher: Matcher::AnyOf(&[
            Matcher::EndsWith(&[".yaml", ".yml"]),
            Matcher::Contains(&["roles", "files/"]),
        ]),
        category: Category::IacProgramUnit,
    },
];

static PUPPET_RULES: &[Rule] = &[
    Rule {
        matcher: Matcher::Contains(&["spec/"]),
        category: Category::TestUnit,
    },
    Rule {
        matcher: Matcher::Contains(&["provider", "lib/", "tasks/"]),
        category: Category::ConfigUnit,
    },
    Rule {
        matcher: Matcher::Contains(&["templates/"]),
        category: Category::TemplateUnit,
    },
    Rule {
        matcher: Matcher::Contains(&["manifests/", "types/", "data/"]),
        category: Category::IacProgramUnit,
    },
    Rule {
        matcher: Matcher::AnyOf(&[
            Matcher::Contains(&[
                "changelog",
                "doc",
                "github",
                "Guardfile",
                "Modulefile",
                "Gemfile",
                "metadata.json",
                ".fixtures.yml",
                ".gitignore",
            ]),
            Matcher::EndsWith(IGNORED_SUFFIXES),
            Matcher::NoSeparator,
        ]),
        category: Category::Unclassified,
    },
];

static CHEF_RULES: &[Rule] = &[
    Rule {
        matcher: Matcher::AllOf(&[
            Matcher::Contains(&["test", "spec/"]),
            Matcher::Not(&Matcher::StartsWith(&["roles"])),
        ]),
        category: Category::TestUnit,
    },
    Rule {
        matcher: Matcher::Contains(&["resources/", "libraries/", "providers/"]),
        category: Category::ConfigUnit,
    },
    Rule {
        matcher: Matcher::Contains(&["templates/"]),
        category: Category::TemplateUnit,
    },
    Rule {
        matcher: Matcher::Contains(&["recipes/", "attributes/", "metadata.rb", "files/"]),
        category: Category::IacProgramUnit,
    },
    Rule {
        matcher: Matcher::AnyOf(&[
            Matcher::Contains(&["changelog", "doc", "github", "deployments/"]),
            Matcher::EndsWith(&[".md", ".bugfix", ".rst", ".yml"]),
            Matcher::NoSeparator,
        ]),
        category: Category::Unclassified,
    },
];

/// Rule table of an ecosystem, in evaluation order.
pub fn rules(ecosystem: Ecosystem) -> &'static [Rule] {
    match ecosystem {
        Ecosystem::Ansible => ANSIBLE_RULES,
        Ecosystem::Puppet => PUPPET_RULES,
        Ecosystem::Chef => CHEF_RULES,
    }
}

/// Run a path through the ecosystem's rule table without side effects.
pub fn evaluate(ecosystem: Ecosystem, path: &str) -> Outcome {
    rules(ecosystem)
        .iter()
        .enumerate()
        .find(|(_, rule)| rule.matcher.matches(path))
        .map(|(index, rule)| Outcome::Matched {
            index,
            category: rule.category,
        })
        .unwrap_or(Outcome::Unhandled)
}

/// Evaluate a path, warning about paths no rule covers.
pub fn inspect(ecosystem: Ecosystem, path: &str) -> Outcome {
    let outcome = evaluate(ecosystem, path);
    if outcome == Outcome::Unhandled {
        warn!("Unclassified file: {path} ({ecosystem})");
    }
    outcome
}

/// Classify a changed file.
pub fn classify(ecosystem: Ecosystem, path: &str) -> Category {
    inspect(ecosystem, path).category()
}

/// Classify a file given a raw ecosystem tag.
pub fn classify_tag(ecosystem: &str, path: &str) -> Result<Category> {
    let ecosystem = ecosystem.parse::<Ecosystem>()?;
    Ok(classify(ecosystem, path))
}
