//! Fixed user-facing replies. Failure text never carries error details.

use crate::lexicon::Commodity;

pub const CLARIFICATION_PROMPT: &str = "Kripya fasal ka naam bataiye jiska bhav jaanna hai, \
jaise aloo, pyaaz, tamatar, gehu, sarso ya dhan.";

pub const PRICE_UNAVAILABLE: &str =
    "Maaf kijiye, abhi mandi bhav uplabdh nahi hain. Kripya thodi der baad koshish karein.";

pub const GENERATION_FAILED: &str =
    "Maaf kijiye, jawab laane mein dikkat hui. Kripya dobara koshish karein.";

pub const OFFLINE_NO_MATCH: &str = "माफ़ कीजिए, इस सवाल का ऑफ़लाइन जवाब उपलब्ध नहीं है।";

pub const OFFLINE_UNAVAILABLE: &str =
    "माफ़ कीजिए, ऑफ़लाइन जवाब अभी उपलब्ध नहीं हैं। कृपया बाद में कोशिश करें।";

pub const OFFLINE_ANNOTATION: &str = "\n\n*(यह जवाब ऑफ़लाइन कैश से दिया गया है।)*";

pub fn no_price_data(commodity: Commodity) -> String {
    format!("Maaf kijiye, mujhe '{commodity}' ke liye koi bhav nahi mila.")
}

pub fn price_header(commodity: Commodity) -> String {
    format!("'{commodity}' के ताज़ा भाव:\n\n")
}

pub fn annotate_offline(reply: &str) -> String {
    format!("{reply}{OFFLINE_ANNOTATION}")
}

#[cfg(test)]
mod tests {
    use super::{annotate_offline, no_price_data, OFFLINE_ANNOTATION};
    use crate::lexicon::Commodity;

    #[test]
    fn no_data_message_names_the_commodity() {
        assert!(no_price_data(Commodity::Onion).contains("Onion"));
        assert!(no_price_data(Commodity::Paddy).contains("Paddy(Dhan)(Common)"));
    }

    #[test]
    fn offline_annotation_is_appended_verbatim() {
        let annotated = annotate_offline("Neem oil spray karein.");
        assert!(annotated.starts_with("Neem oil spray karein."));
        assert!(annotated.ends_with(OFFLINE_ANNOTATION));
    }
}
