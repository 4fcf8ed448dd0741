mod mashup_tests;
