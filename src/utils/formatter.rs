use crate::http::ResponseData;
use colored::*;
use serde_json::Value;

pub enum ResponseFormat {
    Compact,
    Verbose,
}

pub struct ResponseFormatter {
    format: ResponseFormat,
    color: bool,
    show_body: bool,
    show_headers: bool,
    show_timing: bool,
}

impl ResponseFormatter {
    /// 紧凑模式下完整显示的最大响应体长度
    const COMPACT_BODY_LIMIT: usize = 200;

    pub fn new(format: ResponseFormat) -> Self {
        Self {
            format,
            color: true,
            show_body: true,
            show_headers: true,
            show_timing: true,
        }
    }

    pub fn without_color(mut self) -> Self {
        self.color = false;
        self
    }

    pub fn format(&self, response: &ResponseData) -> String {
        match self.format {
            ResponseFormat::Compact => self.format_compact(response),
            ResponseFormat::Verbose => self.format_verbose(response),
        }
    }

    fn format_compact(&self, response: &ResponseData) -> String {
        let mut output = vec![self.status_line(response, false)];

        if self.show_timing {
            output.push(self.paint(format!("Time: {}ms", response.duration_ms), |s| s.cyan()));
        }

        if self.show_body {
            let body = render_body(&response.data);
            if !body.is_empty() && body.len() < Self::COMPACT_BODY_LIMIT {
                output.push(body);
            } else if !body.is_empty() {
                output.push(format!("Body: {} bytes", response.size));
            }
        }

        output.join("\n")
    }

    fn format_verbose(&self, response: &ResponseData) -> String {
        let mut output = vec![self.status_line(response, true)];

        if self.show_timing {
            output.push(self.paint(format!("Time: {}ms", response.duration_ms), |s| s.cyan()));
            output.push(self.paint(format!("URL: {}", response.url), |s| s.cyan()));
        }

        if self.show_headers && !response.headers.is_empty() {
            output.push(String::new());
            output.push(self.paint("Headers:".to_string(), |s| s.blue().bold()));
            for (key, value) in &response.headers {
                output.push(self.paint(format!("   {}: {}", key, value), |s| s.blue()));
            }
        }

        if self.show_body {
            let body = render_body(&response.data);
            if !body.is_empty() {
                output.push(String::new());
                output.push(self.paint("Body:".to_string(), |s| s.blue().bold()));
                output.push(body);
            }
        }

        output.join("\n")
    }

    fn status_line(&self, response: &ResponseData, bold: bool) -> String {
        let line = format!("HTTP {} {}", response.status, response.status_text)
            .trim_end()
            .to_string();
        if !self.color {
            return line;
        }

        let colored = if response.is_success() {
            line.green()
        } else if response.is_client_error() {
            line.yellow()
        } else {
            line.red()
        };
        if bold {
            colored.bold().to_string()
        } else {
            colored.to_string()
        }
    }

    fn paint(&self, text: String, style: impl FnOnce(&str) -> ColoredString) -> String {
        if self.color {
            style(&text).to_string()
        } else {
            text
        }
    }
}

/// 字符串原样显示，其余按 JSON 美化
fn render_body(data: &Value) -> String {
    match data {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}
