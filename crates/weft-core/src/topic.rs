//! Topic name composition and validation.
//!
//! The canonical key for every registry in the fabric is the fully-qualified
//! name `<partition>@<namespace>/<topic>`. The partition prefix ends at the
//! last `@`; user-facing views always strip it.

use crate::{Error, Result};

/// Delimiter separating the partition prefix from the scoped name.
pub const PARTITION_DELIMITER: char = '@';

/// Maximum length of a fully-qualified name in bytes.
pub const MAX_NAME_LENGTH: usize = 65_535;

/// Check whether a partition or namespace component is well formed.
///
/// Components may be empty. They must not contain whitespace, the partition
/// delimiter, or empty path segments.
pub fn is_valid_component(component: &str) -> bool {
    !component.contains(char::is_whitespace)
        && !component.contains(PARTITION_DELIMITER)
        && !component.contains("//")
}

/// Check whether a topic (or service) name is well formed.
pub fn is_valid_topic(topic: &str) -> bool {
    is_valid_component(topic) && topic.chars().any(|c| c != '/')
}

/// Compose a fully-qualified name from a partition, a namespace, and a topic.
///
/// A topic starting with `/` is absolute and ignores the namespace. The
/// result embeds the partition before the last `@` and always scopes the
/// remainder under a leading `/`.
pub fn fully_qualified(partition: &str, namespace: &str, topic: &str) -> Result<String> {
    if !is_valid_component(partition) {
        return Err(Error::topic(format!("Partition [{partition}] is not valid")));
    }
    if !is_valid_component(namespace) {
        return Err(Error::topic(format!("Namespace [{namespace}] is not valid")));
    }
    if !is_valid_topic(topic) {
        return Err(Error::topic(format!("Topic [{topic}] is not valid")));
    }

    let mut name = if topic.starts_with('/') {
        topic.to_string()
    } else {
        let namespace = namespace.trim_matches('/');
        if namespace.is_empty() {
            format!("/{topic}")
        } else {
            format!("/{namespace}/{topic}")
        }
    };

    while name.len() > 1 && name.ends_with('/') {
        name.pop();
    }

    let fq = format!("{partition}{PARTITION_DELIMITER}{name}");
    if fq.len() > MAX_NAME_LENGTH {
        return Err(Error::topic(format!(
            "Fully-qualified name for topic [{topic}] exceeds {MAX_NAME_LENGTH} bytes"
        )));
    }

    Ok(fq)
}

/// Remove the partition prefix from a fully-qualified name.
///
/// Everything up to and including the last `@` is stripped. Names without a
/// delimiter are returned unchanged.
pub fn strip_partition(fq_name: &str) -> &str {
    match fq_name.rfind(PARTITION_DELIMITER) {
        Some(index) => &fq_name[index + 1..],
        None => fq_name,
    }
}

/// Extract the partition prefix of a fully-qualified name.
pub fn partition_of(fq_name: &str) -> &str {
    match fq_name.rfind(PARTITION_DELIMITER) {
        Some(index) => &fq_name[..index],
        None => "",
    }
}
