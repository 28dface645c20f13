// 该文件是 DermaScan （皮肤镜） 项目的一部分。
// src/report/pdf.rs - PDF 排版与输出
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

//! 最小的 PDF 1.4 输出：US Letter 页面，标准 14 字体，未压缩的内容流，
//! 图像以 DCTDecode 方式直接嵌入 JPEG 数据。

use std::io::Write;

use chrono::{DateTime, Local};
use tracing::debug;

use crate::report::{
  EmbeddedImage, ImageBlock, Listing, ReportAssemblyError, ReportOutline, Section,
};

const PAGE_WIDTH: f32 = 612.0;
const PAGE_HEIGHT: f32 = 792.0;
const MARGIN: f32 = 72.0;
const FRAME_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;
const FRAME_TOP: f32 = PAGE_HEIGHT - MARGIN;
const LEADING: f32 = 1.2;
const INCH: f32 = 72.0;

const CELL_PAD_X: f32 = 6.0;
const CELL_PAD_TOP: f32 = 3.0;
const IMAGE_RESOURCE: &str = "Im1";

#[derive(Debug, Clone, Copy, PartialEq)]
struct Color(f32, f32, f32);

const fn hex(rgb: u32) -> Color {
  Color(
    ((rgb >> 16) & 0xff) as f32 / 255.0,
    ((rgb >> 8) & 0xff) as f32 / 255.0,
    (rgb & 0xff) as f32 / 255.0,
  )
}

const BLACK: Color = hex(0x000000);
const WHITE: Color = hex(0xffffff);
const BRAND_BLUE: Color = hex(0x1e40af);
const LABEL_GRAY: Color = hex(0xf3f4f6);
const PRODUCT_GREEN: Color = hex(0x059669);
const MUTED_GRAY: Color = hex(0x6b7280);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Font {
  Regular,
  Bold,
  Symbol,
}

// Helvetica 与 Helvetica-Bold 在 0x20..=0x7e 范围内的字宽（1/1000 em）
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
  278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
  556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
  1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
  667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
  333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
  556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
  278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
  556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
  975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
  667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
  333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
  611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

const STAR_WIDTH: u16 = 816;
const STAR_CODE: u8 = b'H';

impl Font {
  const ALL: [Font; 3] = [Font::Regular, Font::Bold, Font::Symbol];

  fn resource(self) -> &'static str {
    match self {
      Font::Regular => "F1",
      Font::Bold => "F2",
      Font::Symbol => "F3",
    }
  }

  fn dictionary(self) -> &'static str {
    match self {
      Font::Regular => {
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
      }
      Font::Bold => {
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>"
      }
      Font::Symbol => "<< /Type /Font /Subtype /Type1 /BaseFont /ZapfDingbats >>",
    }
  }

  fn advance(self, code: u8) -> u16 {
    let table = match self {
      Font::Regular => &HELVETICA_WIDTHS,
      Font::Bold => &HELVETICA_BOLD_WIDTHS,
      Font::Symbol => return STAR_WIDTH,
    };
    match code {
      0x20..=0x7e => table[(code - 0x20) as usize],
      _ => table[(b'0' - 0x20) as usize],
    }
  }
}

/// Unicode 字符到 WinAnsiEncoding 的映射，无法表示的字符替换为 `?`
fn win_ansi(c: char) -> u8 {
  match c {
    ' '..='~' => c as u8,
    '\u{a0}'..='\u{ff}' => c as u32 as u8,
    '€' => 0x80,
    '‚' => 0x82,
    'ƒ' => 0x83,
    '„' => 0x84,
    '…' => 0x85,
    '†' => 0x86,
    '‡' => 0x87,
    'ˆ' => 0x88,
    '‰' => 0x89,
    'Š' => 0x8a,
    '‹' => 0x8b,
    'Œ' => 0x8c,
    'Ž' => 0x8e,
    '‘' => 0x91,
    '’' => 0x92,
    '“' => 0x93,
    '”' => 0x94,
    '•' => 0x95,
    '–' => 0x96,
    '—' => 0x97,
    '˜' => 0x98,
    '™' => 0x99,
    'š' => 0x9a,
    '›' => 0x9b,
    'œ' => 0x9c,
    'ž' => 0x9e,
    'Ÿ' => 0x9f,
    _ => b'?',
  }
}

/// PDF 字面字符串，括号和反斜杠转义，非 ASCII 字节用八进制
fn literal(codes: &[u8]) -> String {
  let mut out = String::with_capacity(codes.len() + 2);
  out.push('(');
  for &b in codes {
    match b {
      b'(' | b')' | b'\\' => {
        out.push('\\');
        out.push(b as char);
      }
      0x20..=0x7e => out.push(b as char),
      _ => out.push_str(&format!("\\{:03o}", b)),
    }
  }
  out.push(')');
  out
}

#[derive(Debug, Clone, PartialEq)]
struct Span {
  text: String,
  font: Font,
}

impl Span {
  fn regular(text: impl Into<String>) -> Self {
    Self {
      text: text.into(),
      font: Font::Regular,
    }
  }

  fn bold(text: impl Into<String>) -> Self {
    Self {
      text: text.into(),
      font: Font::Bold,
    }
  }
}

/// 按字体切分后的字节串，星号走 ZapfDingbats
fn glyph_runs(spans: &[Span]) -> Vec<(Font, Vec<u8>)> {
  let mut runs: Vec<(Font, Vec<u8>)> = Vec::new();
  for span in spans {
    for c in span.text.chars() {
      let (font, code) = if c == '★' {
        (Font::Symbol, STAR_CODE)
      } else {
        (span.font, win_ansi(c))
      };
      match runs.last_mut() {
        Some((last, codes)) if *last == font => codes.push(code),
        _ => runs.push((font, vec![code])),
      }
    }
  }
  runs
}

fn runs_width(runs: &[(Font, Vec<u8>)], size: f32) -> f32 {
  runs
    .iter()
    .flat_map(|(font, codes)| codes.iter().map(move |&b| font.advance(b) as f32))
    .sum::<f32>()
    * size
    / 1000.0
}

fn spans_width(spans: &[Span], size: f32) -> f32 {
  runs_width(&glyph_runs(spans), size)
}

/// 贪心断行；单个单词超过宽度时独占一行
fn wrap(spans: &[Span], size: f32, max_width: f32) -> Vec<Vec<Span>> {
  let space = Font::Regular.advance(b' ') as f32 * size / 1000.0;
  let mut lines: Vec<Vec<Span>> = Vec::new();
  let mut line: Vec<Span> = Vec::new();
  let mut width = 0.0;

  for span in spans {
    for word in span.text.split_whitespace() {
      let word_width = spans_width(&[Span { text: word.to_string(), font: span.font }], size);
      if !line.is_empty() && width + space + word_width > max_width {
        lines.push(std::mem::take(&mut line));
        width = 0.0;
      }

      if line.is_empty() {
        line.push(Span { text: word.to_string(), font: span.font });
        width = word_width;
        continue;
      }

      width += space + word_width;
      match line.last_mut() {
        Some(last) if last.font == span.font => {
          last.text.push(' ');
          last.text.push_str(word);
        }
        Some(last) => {
          last.text.push(' ');
          line.push(Span { text: word.to_string(), font: span.font });
        }
        None => {}
      }
    }
  }

  if !line.is_empty() {
    lines.push(line);
  }
  lines
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Align {
  Left,
  Center,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ParagraphStyle {
  size: f32,
  color: Color,
  align: Align,
  space_after: f32,
}

const COMPANY_HEADER: ParagraphStyle = ParagraphStyle {
  size: 16.0,
  color: BRAND_BLUE,
  align: Align::Center,
  space_after: 20.0,
};
const SERVICE_TITLE: ParagraphStyle = ParagraphStyle {
  size: 14.0,
  color: BRAND_BLUE,
  align: Align::Center,
  space_after: 15.0,
};
const REPORT_TITLE: ParagraphStyle = ParagraphStyle {
  size: 18.0,
  color: BLACK,
  align: Align::Center,
  space_after: 25.0,
};
const SECTION_HEADER: ParagraphStyle = ParagraphStyle {
  size: 12.0,
  color: BRAND_BLUE,
  align: Align::Left,
  space_after: 8.0,
};
const NORMAL: ParagraphStyle = ParagraphStyle {
  size: 10.0,
  color: BLACK,
  align: Align::Left,
  space_after: 6.0,
};
const FOOTER: ParagraphStyle = ParagraphStyle {
  size: 8.0,
  color: MUTED_GRAY,
  align: Align::Center,
  space_after: 0.0,
};

#[derive(Debug, Clone, PartialEq)]
struct Table {
  widths: Vec<f32>,
  rows: Vec<Vec<String>>,
  size: f32,
  pad_bottom: f32,
  /// 表头背景色，表头文字为白色粗体
  header: Option<Color>,
  /// 首列背景色，首列文字为粗体
  label_column: Option<Color>,
}

impl Table {
  fn cell_style(&self, row: usize, col: usize) -> (Font, Color, Option<Color>) {
    match (self.header, self.label_column) {
      (Some(bg), _) if row == 0 => (Font::Bold, WHITE, Some(bg)),
      (_, Some(bg)) if col == 0 => (Font::Bold, BLACK, Some(bg)),
      _ => (Font::Regular, BLACK, None),
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
enum Block<'a> {
  Paragraph(Vec<Span>, ParagraphStyle),
  Spacer(f32),
  Table(Table),
  Image(&'a EmbeddedImage),
}

fn text<'a>(text: impl Into<String>, style: ParagraphStyle) -> Block<'a> {
  Block::Paragraph(vec![Span::regular(text)], style)
}

fn labelled<'a>(label: &str, value: &str) -> Block<'a> {
  Block::Paragraph(
    vec![Span::bold(label), Span::regular(format!(" {}", value))],
    NORMAL,
  )
}

/// 将章节大纲展开为排版块
fn blocks(outline: &ReportOutline) -> Vec<Block<'_>> {
  let mut blocks = Vec::new();

  for section in outline.sections() {
    if let Some(heading) = section.kind().heading() {
      blocks.push(Block::Paragraph(vec![Span::bold(heading)], SECTION_HEADER));
    }

    match section {
      Section::Header {
        organization,
        service,
        generated_at,
      } => {
        blocks.push(Block::Paragraph(vec![Span::bold(*organization)], COMPANY_HEADER));
        blocks.push(Block::Paragraph(vec![Span::bold(*service)], SERVICE_TITLE));
        blocks.push(text(generated_at.clone(), NORMAL));
        blocks.push(Block::Spacer(20.0));
      }
      Section::Title(title) => {
        blocks.push(Block::Paragraph(vec![Span::bold(*title)], REPORT_TITLE));
        blocks.push(Block::Spacer(15.0));
      }
      Section::Patient { rows } => {
        blocks.push(Block::Table(Table {
          widths: vec![2.0 * INCH, 4.0 * INCH],
          rows: rows
            .iter()
            .map(|(label, value)| vec![label.to_string(), value.clone()])
            .collect(),
          size: 10.0,
          pad_bottom: 6.0,
          header: None,
          label_column: Some(LABEL_GRAY),
        }));
        blocks.push(Block::Spacer(15.0));
      }
      Section::Image(image) => {
        match image {
          ImageBlock::Embedded(embedded) => blocks.push(Block::Image(embedded)),
          ImageBlock::Unavailable(note) => blocks.push(text(note.clone(), NORMAL)),
        }
        blocks.push(Block::Spacer(15.0));
      }
      Section::Results {
        primary_condition,
        confidence,
        rows,
      } => {
        blocks.push(labelled("Primary Condition:", primary_condition));
        blocks.push(labelled("Confidence Level:", confidence));
        blocks.push(Block::Spacer(10.0));
        blocks.push(Block::Paragraph(
          vec![Span::bold("Condition Probabilities:")],
          NORMAL,
        ));

        let mut table = vec![vec![
          "Condition".to_string(),
          "Probability".to_string(),
          "Severity".to_string(),
        ]];
        table.extend(rows.iter().map(|row| {
          vec![
            row.condition.clone(),
            row.probability.clone(),
            row.severity.to_string(),
          ]
        }));
        blocks.push(Block::Table(Table {
          widths: vec![2.5 * INCH, 1.5 * INCH, 1.0 * INCH],
          rows: table,
          size: 9.0,
          pad_bottom: 4.0,
          header: Some(BRAND_BLUE),
          label_column: None,
        }));
        blocks.push(Block::Spacer(15.0));
      }
      Section::Recommendations(listing) => {
        match listing {
          Listing::Items(items) => blocks.extend(items.iter().map(|item| text(item.clone(), NORMAL))),
          Listing::Fallback(fallback) => blocks.push(text(*fallback, NORMAL)),
        }
        blocks.push(Block::Spacer(15.0));
      }
      Section::Products(listing) => {
        match listing {
          Listing::Items(products) => {
            let mut table = vec![vec![
              "Product".to_string(),
              "Brand".to_string(),
              "Rating".to_string(),
              "Price".to_string(),
            ]];
            table.extend(products.iter().map(|p| {
              vec![
                p.name.clone(),
                p.brand.clone(),
                p.rating.clone(),
                p.price.clone(),
              ]
            }));
            blocks.push(Block::Table(Table {
              widths: vec![2.0 * INCH, 1.5 * INCH, 0.8 * INCH, 1.0 * INCH],
              rows: table,
              size: 8.0,
              pad_bottom: 4.0,
              header: Some(PRODUCT_GREEN),
              label_column: None,
            }));
          }
          Listing::Fallback(fallback) => blocks.push(text(*fallback, NORMAL)),
        }
        blocks.push(Block::Spacer(15.0));
      }
      Section::Disclaimer { paragraphs, footer } => {
        blocks.extend(paragraphs.iter().map(|p| text(*p, NORMAL)));
        blocks.push(Block::Spacer(20.0));
        blocks.push(text(*footer, FOOTER));
      }
    }
  }

  blocks
}

/// 自上而下的流式排版，放不下时换页
struct Layout {
  pages: Vec<String>,
  ops: String,
  y: f32,
}

impl Layout {
  fn new() -> Self {
    Self {
      pages: Vec::new(),
      ops: String::new(),
      y: FRAME_TOP,
    }
  }

  fn new_page(&mut self) {
    self.pages.push(std::mem::take(&mut self.ops));
    self.y = FRAME_TOP;
  }

  /// 当前页剩余空间不足且当前页不为空时换页
  fn reserve(&mut self, height: f32) {
    if self.y - height < MARGIN && self.y < FRAME_TOP {
      self.new_page();
    }
  }

  fn fill(&mut self, color: Color) {
    self
      .ops
      .push_str(&format!("{:.3} {:.3} {:.3} rg\n", color.0, color.1, color.2));
  }

  fn draw_text(&mut self, spans: &[Span], x: f32, baseline: f32, size: f32, color: Color) {
    let mut x = x;
    for (font, codes) in glyph_runs(spans) {
      self.fill(color);
      self.ops.push_str(&format!(
        "BT /{} {:.1} Tf {:.2} {:.2} Td {} Tj ET\n",
        font.resource(),
        size,
        x,
        baseline,
        literal(&codes)
      ));
      x += runs_width(&[(font, codes)], size);
    }
  }

  fn paragraph(&mut self, spans: &[Span], style: ParagraphStyle) {
    let leading = style.size * LEADING;
    for line in wrap(spans, style.size, FRAME_WIDTH) {
      self.reserve(leading);
      let x = match style.align {
        Align::Left => MARGIN,
        Align::Center => MARGIN + (FRAME_WIDTH - spans_width(&line, style.size)) / 2.0,
      };
      let baseline = self.y - style.size;
      self.draw_text(&line, x, baseline, style.size, style.color);
      self.y -= leading;
    }
    self.y -= style.space_after;
  }

  fn spacer(&mut self, height: f32) {
    self.y -= height;
    if self.y < MARGIN {
      self.new_page();
    }
  }

  fn table(&mut self, table: &Table) {
    let total: f32 = table.widths.iter().sum();
    let left = MARGIN + (FRAME_WIDTH - total) / 2.0;
    let leading = table.size * LEADING;

    for (r, row) in table.rows.iter().enumerate() {
      let cells: Vec<(Vec<Vec<Span>>, Color, Option<Color>)> = row
        .iter()
        .zip(&table.widths)
        .enumerate()
        .map(|(c, (cell, width))| {
          let (font, color, background) = table.cell_style(r, c);
          let lines = wrap(
            &[Span { text: cell.clone(), font }],
            table.size,
            width - 2.0 * CELL_PAD_X,
          );
          (lines, color, background)
        })
        .collect();

      let lines = cells.iter().map(|(l, _, _)| l.len()).max().unwrap_or(0).max(1);
      let height = CELL_PAD_TOP + lines as f32 * leading + table.pad_bottom;
      self.reserve(height);

      let top = self.y;
      let mut x = left;
      for ((lines, color, background), width) in cells.iter().zip(&table.widths) {
        if let Some(bg) = background {
          self.fill(*bg);
          self.ops.push_str(&format!(
            "{:.2} {:.2} {:.2} {:.2} re f\n",
            x,
            top - height,
            width,
            height
          ));
        }
        for (k, line) in lines.iter().enumerate() {
          let baseline = top - CELL_PAD_TOP - table.size - k as f32 * leading;
          self.draw_text(line, x + CELL_PAD_X, baseline, table.size, *color);
        }
        self.ops.push_str(&format!(
          "0 0 0 RG 1 w {:.2} {:.2} {:.2} {:.2} re S\n",
          x,
          top - height,
          width,
          height
        ));
        x += width;
      }
      self.y -= height;
    }
  }

  fn image(&mut self, image: &EmbeddedImage) {
    let (width, height) = image.size();
    self.reserve(height);
    let x = MARGIN + (FRAME_WIDTH - width) / 2.0;
    self.ops.push_str(&format!(
      "q {:.2} 0 0 {:.2} {:.2} {:.2} cm /{} Do Q\n",
      width,
      height,
      x,
      self.y - height,
      IMAGE_RESOURCE
    ));
    self.y -= height;
  }

  fn finish(mut self) -> Vec<String> {
    if !self.ops.is_empty() || self.pages.is_empty() {
      self.new_page();
    }
    self.pages
  }
}

/// 按对象编号收集 PDF 对象，最后统一写出交叉引用表
struct PdfWriter {
  objects: Vec<Option<Vec<u8>>>,
}

impl PdfWriter {
  fn new() -> Self {
    Self {
      objects: Vec::new(),
    }
  }

  fn reserve(&mut self) -> usize {
    self.objects.push(None);
    self.objects.len()
  }

  fn put(&mut self, id: usize, body: Vec<u8>) {
    self.objects[id - 1] = Some(body);
  }

  fn add(&mut self, body: Vec<u8>) -> usize {
    self.objects.push(Some(body));
    self.objects.len()
  }

  fn stream(dictionary: &str, data: &[u8]) -> Vec<u8> {
    let mut body = format!("<< {} /Length {} >>\nstream\n", dictionary, data.len()).into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(b"\nendstream");
    body
  }

  fn finish(self, root: usize, info: usize) -> Result<Vec<u8>, ReportAssemblyError> {
    let mut out = Vec::new();
    out.write_all(b"%PDF-1.4\n%\xe2\xe3\xcf\xd3\n")?;

    let mut offsets = Vec::with_capacity(self.objects.len());
    for (i, object) in self.objects.iter().enumerate() {
      let body = object
        .as_ref()
        .ok_or_else(|| ReportAssemblyError::Layout(format!("对象 {} 未写入", i + 1)))?;
      offsets.push(out.len());
      write!(out, "{} 0 obj\n", i + 1)?;
      out.write_all(body)?;
      out.write_all(b"\nendobj\n")?;
    }

    let xref = out.len();
    write!(out, "xref\n0 {}\n0000000000 65535 f \n", self.objects.len() + 1)?;
    for offset in offsets {
      write!(out, "{:010} 00000 n \n", offset)?;
    }
    write!(
      out,
      "trailer\n<< /Size {} /Root {} 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
      self.objects.len() + 1,
      root,
      info,
      xref
    )?;
    Ok(out)
  }
}

fn embedded_image(outline: &ReportOutline) -> Option<&EmbeddedImage> {
  outline.sections().iter().find_map(|section| match section {
    Section::Image(ImageBlock::Embedded(image)) => Some(image),
    _ => None,
  })
}

/// 排版并输出 PDF，返回文档字节和页数
pub(crate) fn render(
  outline: &ReportOutline,
  now: DateTime<Local>,
) -> Result<(Vec<u8>, usize), ReportAssemblyError> {
  let mut layout = Layout::new();
  for block in blocks(outline) {
    match block {
      Block::Paragraph(spans, style) => layout.paragraph(&spans, style),
      Block::Spacer(height) => layout.spacer(height),
      Block::Table(table) => layout.table(&table),
      Block::Image(image) => layout.image(image),
    }
  }
  let pages = layout.finish();
  debug!("排版完成: {} 页", pages.len());

  let mut writer = PdfWriter::new();
  let catalog = writer.reserve();
  let page_tree = writer.reserve();

  let fonts: Vec<String> = Font::ALL
    .iter()
    .map(|font| {
      let id = writer.add(font.dictionary().as_bytes().to_vec());
      format!("/{} {} 0 R", font.resource(), id)
    })
    .collect();

  let info = writer.add(
    format!(
      "<< /Title (Skin Analysis Report) /Author (Inveep Inc) /Creator (MedicImage - DermaScan) \
       /Producer (DermaScan) /CreationDate (D:{}) >>",
      now.format("%Y%m%d%H%M%S")
    )
    .into_bytes(),
  );

  let xobject = match embedded_image(outline) {
    Some(image) => {
      let (w, h) = image.pixel_size();
      let id = writer.add(PdfWriter::stream(
        &format!(
          "/Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace /DeviceRGB \
           /BitsPerComponent 8 /Filter /DCTDecode",
          w, h
        ),
        image.jpeg(),
      ));
      format!(" /XObject << /{} {} 0 R >>", IMAGE_RESOURCE, id)
    }
    None => String::new(),
  };
  let resources = format!("<< /Font << {} >>{} >>", fonts.join(" "), xobject);

  let mut kids = Vec::with_capacity(pages.len());
  for ops in &pages {
    let contents = writer.add(PdfWriter::stream("", ops.as_bytes()));
    let page = writer.add(
      format!(
        "<< /Type /Page /Parent {} 0 R /MediaBox [0 0 {} {}] /Resources {} /Contents {} 0 R >>",
        page_tree, PAGE_WIDTH, PAGE_HEIGHT, resources, contents
      )
      .into_bytes(),
    );
    kids.push(format!("{} 0 R", page));
  }

  writer.put(
    page_tree,
    format!(
      "<< /Type /Pages /Kids [{}] /Count {} >>",
      kids.join(" "),
      kids.len()
    )
    .into_bytes(),
  );
  writer.put(
    catalog,
    format!("<< /Type /Catalog /Pages {} 0 R >>", page_tree).into_bytes(),
  );

  let bytes = writer.finish(catalog, info)?;
  Ok((bytes, pages.len()))
}
