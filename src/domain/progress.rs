//! Heurística de progreso a partir del texto que imprime OpenPose.
//!
//! El formato de los logs de OpenPose no está garantizado: la tabla solo da una
//! aproximación gruesa del avance.

/// Marcadores en orden de prioridad; gana el primero que aparezca en la línea.
pub const PROGRESS_MARKERS: [(&str, u8); 5] = [
    ("Starting processing", 35),
    ("Processing", 50),
    ("Finished", 75),
    ("Rendering pose keypoints", 60),
    ("Parsing complete", 70),
];

pub const PASS_LAUNCH_PROGRESS: u8 = 25;
pub const PASS_COMMAND_PROGRESS: u8 = 30;

pub fn infer_progress(line: &str) -> Option<u8> {
    PROGRESS_MARKERS
        .iter()
        .find(|(marker, _)| line.contains(marker))
        .map(|&(_, progress)| progress)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_marker_in_table_order_wins() {
        assert_eq!(infer_progress("Starting processing..."), Some(35));
        assert_eq!(infer_progress("Processing frame 1"), Some(50));
        assert_eq!(infer_progress("Processing done. Finished"), Some(50));
        assert_eq!(infer_progress("Rendering pose keypoints"), Some(60));
        assert_eq!(infer_progress("Parsing complete"), Some(70));
        assert_eq!(infer_progress("OpenPose demo successfully Finished. Total time: 3 s"), Some(75));
    }

    #[test]
    fn finished_outranks_rendering_and_parsing() {
        assert_eq!(infer_progress("Rendering pose keypoints Finished"), Some(75));
        assert_eq!(infer_progress("Parsing complete. Finished"), Some(75));
    }

    #[test]
    fn matching_is_case_sensitive() {
        assert_eq!(infer_progress("finished"), None);
        assert_eq!(infer_progress("starting processing"), None);
        assert_eq!(infer_progress(""), None);
    }
}
