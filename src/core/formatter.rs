//! Template based record formatting
//!
//! Templates use `%(key)s` placeholders, optionally with a `-` (left align) or
//! `0` (zero pad) flag and a width, e.g. `%(levelname)-8s` or `%(msecs)03d`.
//! `%%` renders a literal percent sign. The set of keys is fixed; templates are
//! parsed once, when the formatter is built, so an unknown key is reported as a
//! configuration problem and never at write time.

use super::log_record::LogRecord;
use chrono::format::{Item, StrftimeItems};

/// Template used when a handler has no formatter of its own
pub const DEFAULT_TEMPLATE: &str = "%(message)s";

/// Template used by basic configuration
pub const BASIC_TEMPLATE: &str = "%(levelname)s:%(name)s:%(message)s";

/// Timestamp pattern used when no `datefmt` is configured
pub const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatterError {
    #[error("unknown placeholder '%({name})' in template")]
    UnknownPlaceholder { name: String },

    #[error("malformed placeholder at byte {position} in template")]
    MalformedPlaceholder { position: usize },

    #[error("placeholder '%({name})' cannot use the numeric 'd' conversion")]
    NonNumericConversion { name: String },

    #[error("invalid time format '{pattern}'")]
    InvalidTimeFormat { pattern: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    AscTime,
    Created,
    Msecs,
    LevelName,
    LevelNo,
    Name,
    Message,
    PathName,
    FileName,
    Module,
    LineNo,
    Process,
    Thread,
    ThreadName,
    Fields,
}

impl Placeholder {
    pub fn from_name(name: &str) -> Option<Self> {
        let placeholder = match name {
            "asctime" => Placeholder::AscTime,
            "created" => Placeholder::Created,
            "msecs" => Placeholder::Msecs,
            "levelname" => Placeholder::LevelName,
            "levelno" => Placeholder::LevelNo,
            "name" => Placeholder::Name,
            "message" => Placeholder::Message,
            "pathname" => Placeholder::PathName,
            "filename" => Placeholder::FileName,
            "module" => Placeholder::Module,
            "lineno" => Placeholder::LineNo,
            "process" => Placeholder::Process,
            "thread" => Placeholder::Thread,
            "threadName" => Placeholder::ThreadName,
            "fields" => Placeholder::Fields,
            _ => return None,
        };
        Some(placeholder)
    }

    fn is_numeric(self) -> bool {
        matches!(
            self,
            Placeholder::Created
                | Placeholder::Msecs
                | Placeholder::LevelNo
                | Placeholder::LineNo
                | Placeholder::Process
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field {
        placeholder: Placeholder,
        left_align: bool,
        zero_pad: bool,
        width: usize,
    },
}

/// Renders records into single lines of text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formatter {
    template: String,
    time_format: String,
    segments: Vec<Segment>,
}

impl Default for Formatter {
    fn default() -> Self {
        Self {
            template: DEFAULT_TEMPLATE.to_string(),
            time_format: DEFAULT_TIME_FORMAT.to_string(),
            segments: vec![Segment::Field {
                placeholder: Placeholder::Message,
                left_align: false,
                zero_pad: false,
                width: 0,
            }],
        }
    }
}

impl Formatter {
    /// Build a formatter, validating the template and the time pattern
    ///
    /// # Examples
    ///
    /// ```
    /// use rust_logger_hierarchy::Formatter;
    ///
    /// let formatter = Formatter::new("%(asctime)s - %(name)s - %(levelname)s - %(message)s", None);
    /// assert!(formatter.is_ok());
    ///
    /// let formatter = Formatter::new("%(hostname)s %(message)s", None);
    /// assert!(formatter.is_err());
    /// ```
    pub fn new(template: &str, time_format: Option<&str>) -> Result<Self, FormatterError> {
        let time_format = time_format.unwrap_or(DEFAULT_TIME_FORMAT);
        validate_time_format(time_format)?;
        let segments = parse_template(template)?;

        Ok(Self {
            template: template.to_string(),
            time_format: time_format.to_string(),
            segments,
        })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn time_format(&self) -> &str {
        &self.time_format
    }

    pub fn uses(&self, placeholder: Placeholder) -> bool {
        self.segments.iter().any(|segment| {
            matches!(segment, Segment::Field { placeholder: p, .. } if *p == placeholder)
        })
    }

    /// Render `record` into one line (without trailing newline)
    pub fn render(&self, record: &LogRecord<'_>) -> String {
        let mut out = String::with_capacity(self.template.len() + 64);

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field {
                    placeholder,
                    left_align,
                    zero_pad,
                    width,
                } => {
                    let value = self.field_value(*placeholder, record);
                    pad_into(&mut out, &value, *width, *left_align, *zero_pad);
                }
            }
        }

        out
    }

    fn field_value(&self, placeholder: Placeholder, record: &LogRecord<'_>) -> String {
        match placeholder {
            Placeholder::AscTime => record.timestamp.format(&self.time_format).to_string(),
            Placeholder::Created => format!(
                "{}.{:03}",
                record.timestamp.timestamp(),
                record.timestamp.timestamp_subsec_millis()
            ),
            Placeholder::Msecs => record.timestamp.timestamp_subsec_millis().to_string(),
            Placeholder::LevelName => record.level.to_str().to_string(),
            Placeholder::LevelNo => record.level.number().to_string(),
            Placeholder::Name => {
                if record.logger_name.is_empty() {
                    "root".to_string()
                } else {
                    record.logger_name.to_string()
                }
            }
            Placeholder::Message => record.message().to_string(),
            Placeholder::PathName => record
                .location
                .map_or("(unknown file)", |l| l.file)
                .to_string(),
            Placeholder::FileName => record
                .location
                .map_or("(unknown file)", |l| l.file_name())
                .to_string(),
            Placeholder::Module => record
                .location
                .map_or("(unknown module)", |l| l.module_path)
                .to_string(),
            Placeholder::LineNo => record.location.map_or(0, |l| l.line).to_string(),
            Placeholder::Process => record.process_id.to_string(),
            Placeholder::Thread => record.thread_id.clone(),
            Placeholder::ThreadName => record
                .thread_name
                .clone()
                .unwrap_or_else(|| record.thread_id.clone()),
            Placeholder::Fields => record
                .context
                .map(|context| context.format_fields())
                .unwrap_or_default(),
        }
    }
}

fn pad_into(out: &mut String, value: &str, width: usize, left_align: bool, zero_pad: bool) {
    let len = value.chars().count();
    if len >= width {
        out.push_str(value);
        return;
    }

    let fill = width - len;
    if left_align {
        out.push_str(value);
        out.extend(std::iter::repeat(' ').take(fill));
    } else if zero_pad {
        out.extend(std::iter::repeat('0').take(fill));
        out.push_str(value);
    } else {
        out.extend(std::iter::repeat(' ').take(fill));
        out.push_str(value);
    }
}

fn validate_time_format(pattern: &str) -> Result<(), FormatterError> {
    if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
        return Err(FormatterError::InvalidTimeFormat {
            pattern: pattern.to_string(),
        });
    }
    Ok(())
}

fn parse_template(template: &str) -> Result<Vec<Segment>, FormatterError> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = template.char_indices().peekable();

    while let Some((position, c)) = chars.next() {
        if c != '%' {
            literal.push(c);
            continue;
        }

        match chars.peek() {
            Some((_, '%')) => {
                chars.next();
                literal.push('%');
            }
            Some((_, '(')) => {
                chars.next();

                let mut name = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == ')' {
                        closed = true;
                        break;
                    }
                    name.push(c);
                }
                if !closed || name.is_empty() {
                    return Err(FormatterError::MalformedPlaceholder { position });
                }

                let mut left_align = false;
                let mut zero_pad = false;
                while let Some((_, flag @ ('-' | '0'))) = chars.peek().copied() {
                    chars.next();
                    if flag == '-' {
                        left_align = true;
                    } else {
                        zero_pad = true;
                    }
                }

                let mut width = 0usize;
                while let Some((_, digit)) = chars.peek().copied() {
                    let Some(value) = digit.to_digit(10) else {
                        break;
                    };
                    chars.next();
                    width = width
                        .checked_mul(10)
                        .and_then(|w| w.checked_add(value as usize))
                        .ok_or(FormatterError::MalformedPlaceholder { position })?;
                }

                let conversion = match chars.next() {
                    Some((_, conversion @ ('s' | 'd'))) => conversion,
                    _ => return Err(FormatterError::MalformedPlaceholder { position }),
                };

                let placeholder = Placeholder::from_name(&name)
                    .ok_or_else(|| FormatterError::UnknownPlaceholder { name: name.clone() })?;
                if conversion == 'd' && !placeholder.is_numeric() {
                    return Err(FormatterError::NonNumericConversion { name });
                }

                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Field {
                    placeholder,
                    left_align,
                    zero_pad,
                    width,
                });
            }
            // A lone percent sign is kept as text
            _ => literal.push('%'),
        }
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }

    Ok(segments)
}
