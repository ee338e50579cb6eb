//! Number and matrix formatting for CSS

use crate::parser::model::{px, Matrix};

/// Six-decimal numbers with `.000000` shortened to `.0`
fn shorten(s: String) -> String {
    s.replace(".000000", ".0")
}

/// `matrix(a,b,c,d,e,f)` for static elements; translation in pixels
pub fn matrix(m: &Matrix) -> String {
    let [a, b, c, d, e, f] = m.css_terms();
    shorten(format!(
        "matrix({:.6},{:.6},{:.6},{:.6},{:.6},{:.6})",
        a, b, c, d, e, f
    ))
}

/// `matrix3d(...)` for animated elements; translation in pixels
pub fn matrix3d(m: &Matrix) -> String {
    shorten(format!(
        "matrix3d({:.6},{:.6},0,0,{:.6},{:.6},0,0,0,0,1,0,{:.6},{:.6},0,1)",
        m.sx,
        m.wx,
        m.wy,
        m.sy,
        px(m.tx),
        px(m.ty)
    ))
}

/// `opacity: <v>;`
pub fn opacity_decl(opacity: f64) -> String {
    shorten(format!("opacity: {:.6};", opacity))
}

/// Twips as whole pixels, `<n>px`
pub fn pixels(twips: f64) -> String {
    format!("{}px", px(twips).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Matrix {
        Matrix {
            sx: 100.0,
            sy: 200.0,
            wx: 0.0,
            wy: 220.0,
            tx: 101.0,
            ty: 202.0,
        }
    }

    #[test]
    fn test_matrix() {
        assert_eq!(
            matrix(&sample()),
            "matrix(100.0,0.0,220.0,200.0,5.050000,10.100000)"
        );
        assert_eq!(
            matrix(&Matrix::IDENTITY),
            "matrix(1.0,0.0,0.0,1.0,0.0,0.0)"
        );
    }

    #[test]
    fn test_matrix3d() {
        assert_eq!(
            matrix3d(&sample()),
            "matrix3d(100.0,0.0,0,0,220.0,200.0,0,0,0,0,1,0,5.050000,10.100000,0,1)"
        );
    }

    #[test]
    fn test_opacity_decl() {
        assert_eq!(opacity_decl(0.0), "opacity: 0.0;");
        assert_eq!(opacity_decl(0.46875), "opacity: 0.468750;");
        assert_eq!(opacity_decl(1.0), "opacity: 1.0;");
    }

    #[test]
    fn test_pixels_round_half_away_from_zero() {
        assert_eq!(pixels(4000.0), "200px");
        assert_eq!(pixels(30.0), "2px");
        assert_eq!(pixels(-30.0), "-2px");
        assert_eq!(pixels(29.0), "1px");
    }
}
