use colored::*;

pub struct LogColors {}

impl LogColors {
    pub fn purple(text: &str) -> String {
        // #4B3978
        let purple = Color::TrueColor {
            r: 75,
            g: 57,
            b: 120,
        };

        text.color(purple).to_string()
    }

    pub fn green(text: &str) -> String {
        // #04cd9b
        let green = Color::TrueColor {
            r: 4,
            g: 205,
            b: 155,
        };

        text.color(green).to_string()
    }
}
