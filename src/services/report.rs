// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! PDF reports for recipes, meal plans and workout plans.
//!
//! Layout is computed first as a plain value (pages of positioned text lines
//! and rules, coordinates in millimetres from the top-left corner) and then
//! written out with `printpdf`. Keeping the two apart lets the pagination be
//! tested without parsing PDF output.

use printpdf::{BuiltinFont, IndirectFontRef, Line, Mm, PdfDocument, Point};

use crate::models::{Recipe, WeeklyPlan, WorkoutPlan};

pub const PAGE_WIDTH_MM: f32 = 210.0;
pub const PAGE_HEIGHT_MM: f32 = 297.0;
pub const MARGIN_MM: f32 = 20.0;
pub const CONTENT_WIDTH_MM: f32 = 170.0;

const MM_PER_PT: f32 = 0.3528;
/// Average Helvetica glyph width as a fraction of the font size.
const AVG_GLYPH_EM: f32 = 0.5;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("PDF generation failed: {0}")]
    Pdf(String),
}

impl From<printpdf::Error> for ReportError {
    fn from(e: printpdf::Error) -> Self {
        ReportError::Pdf(e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontFace {
    Regular,
    Bold,
    Italic,
}

impl FontFace {
    fn index(self) -> usize {
        match self {
            FontFace::Regular => 0,
            FontFace::Bold => 1,
            FontFace::Italic => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayoutItem {
    /// `y` is the baseline, measured down from the top edge.
    Text {
        x: f32,
        y: f32,
        size: f32,
        face: FontFace,
        text: String,
    },
    Rule {
        x1: f32,
        x2: f32,
        y: f32,
        thickness: f32,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub items: Vec<LayoutItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub title: String,
    pub pages: Vec<Page>,
}

impl Layout {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// All text items in reading order.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.pages.iter().flat_map(|p| &p.items).filter_map(|item| match item {
            LayoutItem::Text { text, .. } => Some(text.as_str()),
            LayoutItem::Rule { .. } => None,
        })
    }
}

/// Greedy word wrap using an average glyph width for `size` points.
pub fn wrap_text(text: &str, width_mm: f32, size: f32) -> Vec<String> {
    let glyph_mm = AVG_GLYPH_EM * size * MM_PER_PT;
    let max_chars = ((width_mm / glyph_mm).floor() as usize).max(1);

    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut chars: Vec<char> = word.chars().collect();

        // Words longer than a line are hard-split.
        while chars.len() > max_chars {
            if current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = chars.split_off(max_chars);
            lines.push(chars.into_iter().collect());
            chars = rest;
        }

        let word_len = chars.len();
        if word_len == 0 {
            continue;
        }
        if current_len > 0 && current_len + 1 + word_len > max_chars {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.extend(chars);
        current_len += word_len;
    }

    if current_len > 0 {
        lines.push(current);
    }
    lines
}

struct LayoutBuilder {
    title: String,
    pages: Vec<Page>,
    cursor: f32,
}

impl LayoutBuilder {
    fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            pages: vec![Page::default()],
            cursor: MARGIN_MM,
        }
    }

    fn limit() -> f32 {
        PAGE_HEIGHT_MM - MARGIN_MM
    }

    fn new_page(&mut self) {
        self.pages.push(Page::default());
        self.cursor = MARGIN_MM;
    }

    fn push(&mut self, item: LayoutItem) {
        if let Some(page) = self.pages.last_mut() {
            page.items.push(item);
        }
    }

    /// Start a new page if a block of `height` would run past the bottom margin.
    fn reserve(&mut self, height: f32) {
        if self.cursor > MARGIN_MM && self.cursor + height > Self::limit() {
            self.new_page();
        }
    }

    fn gap(&mut self, mm: f32) {
        self.cursor += mm;
    }

    fn text(
        &mut self,
        text: &str,
        indent: f32,
        size: f32,
        line_height: f32,
        face: FontFace,
    ) {
        let width = CONTENT_WIDTH_MM - indent;
        let lines = wrap_text(text, width, size);
        self.reserve(lines.len() as f32 * line_height);

        for line in lines {
            if self.cursor + line_height > Self::limit() {
                self.new_page();
            }
            self.push(LayoutItem::Text {
                x: MARGIN_MM + indent,
                y: self.cursor,
                size,
                face,
                text: line,
            });
            self.cursor += line_height;
        }
    }

    fn rule(&mut self, thickness: f32, y_offset: f32) {
        let y = self.cursor + y_offset;
        self.push(LayoutItem::Rule {
            x1: MARGIN_MM,
            x2: MARGIN_MM + CONTENT_WIDTH_MM,
            y,
            thickness,
        });
    }

    fn finish(self) -> Layout {
        Layout {
            title: self.title,
            pages: self.pages,
        }
    }
}

pub fn layout_recipe(recipe: &Recipe) -> Layout {
    let mut b = LayoutBuilder::new(&recipe.recipe_name);

    b.text(&recipe.recipe_name, 0.0, 22.0, 10.0, FontFace::Bold);
    b.gap(5.0);
    b.text(&recipe.description, 0.0, 12.0, 6.0, FontFace::Italic);
    b.gap(2.0);
    b.text(
        &format!("Preparation time: {}", recipe.prep_time),
        0.0,
        12.0,
        6.0,
        FontFace::Regular,
    );
    b.gap(4.0);
    b.rule(0.5, -5.0);

    b.text("Ingredients", 0.0, 16.0, 8.0, FontFace::Bold);
    b.gap(5.0);
    for ingredient in &recipe.ingredients {
        b.text(&format!("- {ingredient}"), 0.0, 11.0, 6.0, FontFace::Regular);
    }
    b.gap(10.0);

    b.text("Instructions", 0.0, 16.0, 8.0, FontFace::Bold);
    b.gap(5.0);
    for (i, step) in recipe.instructions.iter().enumerate() {
        b.text(&format!("{}. {step}", i + 1), 0.0, 11.0, 6.0, FontFace::Regular);
        b.gap(4.0);
    }

    b.finish()
}

pub fn layout_weekly_plan(plan: &WeeklyPlan, user_name: &str) -> Layout {
    let title = format!("Complete nutrition plan for {user_name}");
    let mut b = LayoutBuilder::new(&title);

    b.text(&title, 0.0, 22.0, 10.0, FontFace::Bold);
    b.gap(10.0);

    let last = plan.days.len().saturating_sub(1);
    for (index, day) in plan.days.iter().enumerate() {
        b.text(&day.day, 0.0, 18.0, 8.0, FontFace::Bold);
        b.gap(8.0);

        for (slot, recipe) in day.meals.iter() {
            b.text(
                &format!("{}: {}", slot.label(), recipe.recipe_name),
                5.0,
                16.0,
                7.0,
                FontFace::Bold,
            );
            b.text(
                &format!("Time: {}", recipe.prep_time),
                5.0,
                10.0,
                8.0,
                FontFace::Italic,
            );

            b.text("Ingredients:", 10.0, 12.0, 6.0, FontFace::Bold);
            b.gap(2.0);
            for ingredient in &recipe.ingredients {
                b.text(&format!("- {ingredient}"), 10.0, 10.0, 5.0, FontFace::Regular);
            }
            b.gap(6.0);

            b.text("Instructions:", 10.0, 12.0, 6.0, FontFace::Bold);
            b.gap(2.0);
            for (i, step) in recipe.instructions.iter().enumerate() {
                b.text(&format!("{}. {step}", i + 1), 10.0, 10.0, 5.0, FontFace::Regular);
                b.gap(2.0);
            }
            b.gap(8.0);
        }

        if index < last {
            b.reserve(8.0);
            b.rule(0.2, 0.0);
            b.gap(8.0);
        }
    }

    b.finish()
}

pub fn layout_workout_plan(plan: &WorkoutPlan) -> Layout {
    let mut b = LayoutBuilder::new(&plan.plan_name);

    b.text(&plan.plan_name, 0.0, 22.0, 10.0, FontFace::Bold);
    b.text(
        &format!("{} - {}", plan.focus, plan.duration),
        0.0,
        14.0,
        7.0,
        FontFace::Italic,
    );
    b.gap(10.0);
    b.rule(0.5, -5.0);

    b.text("Safety recommendations", 0.0, 16.0, 8.0, FontFace::Bold);
    b.gap(5.0);
    for rec in &plan.recommendations {
        b.text(&format!("- {rec}"), 0.0, 11.0, 6.0, FontFace::Regular);
    }
    b.gap(10.0);

    for day in &plan.schedule {
        b.text(&day.day, 0.0, 18.0, 8.0, FontFace::Bold);
        b.gap(8.0);

        for workout in &day.workouts {
            b.text(&workout.name, 5.0, 14.0, 7.0, FontFace::Bold);
            b.text(
                &format!(
                    "Sets: {} | Reps: {} | Rest: {}",
                    workout.sets, workout.repetitions, workout.rest
                ),
                5.0,
                10.0,
                5.0,
                FontFace::Regular,
            );
            b.gap(3.0);
            b.text(&workout.description, 10.0, 11.0, 6.0, FontFace::Regular);
            b.gap(8.0);
        }
    }

    b.finish()
}

/// Write a computed layout to PDF bytes.
pub fn render_pdf(layout: &Layout) -> Result<Vec<u8>, ReportError> {
    let (doc, first_page, first_layer) = PdfDocument::new(
        layout.title.as_str(),
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "Layer 1",
    );

    let fonts: [IndirectFontRef; 3] = [
        doc.add_builtin_font(BuiltinFont::Helvetica)?,
        doc.add_builtin_font(BuiltinFont::HelveticaBold)?,
        doc.add_builtin_font(BuiltinFont::HelveticaOblique)?,
    ];

    for (index, page) in layout.pages.iter().enumerate() {
        let (page_idx, layer_idx) = if index == 0 {
            (first_page, first_layer)
        } else {
            doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1")
        };
        let layer = doc.get_page(page_idx).get_layer(layer_idx);

        for item in &page.items {
            match item {
                LayoutItem::Text {
                    x,
                    y,
                    size,
                    face,
                    text,
                } => {
                    layer.use_text(
                        text.as_str(),
                        *size,
                        Mm(*x),
                        Mm(PAGE_HEIGHT_MM - *y),
                        &fonts[face.index()],
                    );
                }
                LayoutItem::Rule {
                    x1,
                    x2,
                    y,
                    thickness,
                } => {
                    layer.set_outline_thickness(*thickness);
                    let y = Mm(PAGE_HEIGHT_MM - *y);
                    layer.add_line(Line {
                        points: vec![
                            (Point::new(Mm(*x1), y), false),
                            (Point::new(Mm(*x2), y), false),
                        ],
                        is_closed: false,
                    });
                }
            }
        }
    }

    Ok(doc.save_to_bytes()?)
}

/// Download name for a report: whitespace becomes underscores.
pub fn export_file_name(title: &str) -> String {
    let stem: String = title
        .trim()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();
    format!("{stem}.pdf")
}

/// `Content-Disposition` value with an ASCII-only file name.
pub fn content_disposition(file_name: &str) -> String {
    let ascii: String = file_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("attachment; filename=\"{ascii}\"")
}

/// A finished report ready to send.
#[derive(Debug, Clone)]
pub struct RenderedReport {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Renders structured results as downloadable PDFs.
#[derive(Debug, Clone, Default)]
pub struct ReportRenderer;

impl ReportRenderer {
    pub fn new() -> Self {
        Self
    }

    pub fn recipe(&self, recipe: &Recipe) -> Result<RenderedReport, ReportError> {
        let layout = layout_recipe(recipe);
        Ok(RenderedReport {
            file_name: export_file_name(&recipe.recipe_name),
            bytes: render_pdf(&layout)?,
        })
    }

    pub fn weekly_plan(
        &self,
        plan: &WeeklyPlan,
        user_name: &str,
    ) -> Result<RenderedReport, ReportError> {
        let layout = layout_weekly_plan(plan, user_name);
        Ok(RenderedReport {
            file_name: "weekly_nutrition_plan.pdf".to_string(),
            bytes: render_pdf(&layout)?,
        })
    }

    pub fn workout_plan(&self, plan: &WorkoutPlan) -> Result<RenderedReport, ReportError> {
        let layout = layout_workout_plan(plan);
        Ok(RenderedReport {
            file_name: export_file_name(&plan.plan_name),
            bytes: render_pdf(&layout)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DayMeals, PlanDay, Workout, WorkoutDay};

    fn recipe(name: &str, steps: usize) -> Recipe {
        Recipe {
            recipe_name: name.to_string(),
            description: "A light dish".to_string(),
            ingredients: vec!["1 cup oats".to_string(), "200 ml milk".to_string()],
            instructions: (1..=steps)
                .map(|i| format!("Step number {i} of the preparation"))
                .collect(),
            prep_time: "15 min".to_string(),
        }
    }

    fn assert_within_margins(layout: &Layout) {
        for page in &layout.pages {
            for item in &page.items {
                if let LayoutItem::Text { y, .. } = item {
                    assert!(*y >= MARGIN_MM && *y <= PAGE_HEIGHT_MM - MARGIN_MM);
                }
            }
        }
    }

    #[test]
    fn test_wrap_text_respects_width() {
        // 12pt: ~2.1mm per glyph, 170mm fits 80 chars.
        let text = "word ".repeat(60);
        let lines = wrap_text(&text, CONTENT_WIDTH_MM, 12.0);
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| l.chars().count() <= 80));
        assert_eq!(lines.join(" "), text.trim());
    }

    #[test]
    fn test_wrap_text_splits_long_words() {
        let lines = wrap_text(&"x".repeat(200), 50.0, 12.0);
        assert!(lines.len() >= 3);
        assert_eq!(lines.concat().len(), 200);
    }

    #[test]
    fn test_short_recipe_fits_one_page() {
        let layout = layout_recipe(&recipe("Oat porridge", 3));
        assert_eq!(layout.page_count(), 1);
        assert_eq!(layout.lines().next(), Some("Oat porridge"));
        assert!(layout.lines().any(|l| l == "Preparation time: 15 min"));
    }

    #[test]
    fn test_long_recipe_paginates_within_margins() {
        let layout = layout_recipe(&recipe("Long stew", 80));
        assert!(layout.page_count() > 1);
        assert_within_margins(&layout);
        assert!(layout.lines().any(|l| l == "80. Step number 80 of the preparation"));
    }

    #[test]
    fn test_weekly_plan_rules_between_days() {
        let meals = DayMeals {
            breakfast: recipe("a", 1),
            morning_snack: recipe("b", 1),
            lunch: recipe("c", 1),
            afternoon_snack: recipe("d", 1),
            dinner: recipe("e", 1),
        };
        let plan = WeeklyPlan {
            days: ["Monday", "Tuesday", "Wednesday"]
                .iter()
                .map(|d| PlanDay {
                    day: d.to_string(),
                    meals: meals.clone(),
                })
                .collect(),
        };

        let layout = layout_weekly_plan(&plan, "Ana");
        assert_eq!(layout.title, "Complete nutrition plan for Ana");
        let rules = layout
            .pages
            .iter()
            .flat_map(|p| &p.items)
            .filter(|i| matches!(i, LayoutItem::Rule { .. }))
            .count();
        assert_eq!(rules, 2);
        assert_within_margins(&layout);
    }

    #[test]
    fn test_workout_layout_and_pdf_bytes() {
        let plan = WorkoutPlan {
            plan_name: "Active Start".to_string(),
            focus: "Mobility".to_string(),
            duration: "2 days".to_string(),
            schedule: vec![WorkoutDay {
                day: "Day 1".to_string(),
                workouts: vec![Workout {
                    name: "Walk".to_string(),
                    sets: "1".to_string(),
                    repetitions: "20 min".to_string(),
                    description: "Brisk pace".to_string(),
                    rest: "0".to_string(),
                }],
            }],
            recommendations: vec!["Check glucose".to_string()],
        };

        let report = ReportRenderer::new().workout_plan(&plan).unwrap();
        assert_eq!(report.file_name, "Active_Start.pdf");
        assert!(report.bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_export_file_name_and_disposition() {
        assert_eq!(export_file_name("Lentil  stew"), "Lentil__stew.pdf");
        assert_eq!(
            content_disposition("Crema_de_calabacín.pdf"),
            "attachment; filename=\"Crema_de_calabac_n.pdf\""
        );
    }
}
